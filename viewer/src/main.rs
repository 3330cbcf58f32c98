use clap::Parser;

use log::{error, LevelFilter};

use simple_logger::SimpleLogger;

mod app;
mod args;
mod frame_loop;
mod input;
mod render_state;
mod scene;
mod shaders;

use app::App;
use args::Args;

fn main() {
    // clion needs help in trait annotation
    let args = <Args as Parser>::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("Could not set up logging: {e}");
    }

    let app = match App::new(&args) {
        Ok(app) => app,
        Err(e) => {
            error!("{e}");
            std::process::exit(-1);
        }
    };

    app.run();
}
