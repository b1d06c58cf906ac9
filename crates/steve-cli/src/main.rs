mod cli;
mod logging;
mod view;

use steve_core::interrupt;

fn main() {
    if let Err(e) = cli::run() {
        if e.downcast_ref::<interrupt::InterruptedError>().is_some() {
            std::process::exit(130);
        }
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
