fn main() {
    if let Err(err) = todo_reminder_lib::run() {
        eprintln!("todo-reminder: {err}");
        std::process::exit(1);
    }
}
