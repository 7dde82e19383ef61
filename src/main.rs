use threaded_queue::app;

fn main() {
    std::process::exit(app::startup::startup());
}
