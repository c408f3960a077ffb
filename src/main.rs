use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use log::{debug, error};

use imcheck::config::USAGE;
use imcheck::{CheckError, Opts, cli};

fn main() -> ExitCode {
    env_logger::init();

    let opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(err) => return parse_error(err),
    };
    debug!("{:?}", opts);

    match cli::run(&opts) {
        Ok(report) if report.failed => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {:?}", err);
            let code = err
                .chain()
                .find_map(|e| e.downcast_ref::<CheckError>())
                .map_or(2, CheckError::exit_code);
            ExitCode::from(code)
        }
    }
}

/// 参数数量不对时只打印用法，不做任何图片读取
fn parse_error(err: clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        ErrorKind::MissingRequiredArgument
        | ErrorKind::UnknownArgument
        | ErrorKind::TooManyValues
        | ErrorKind::WrongNumberOfValues => {
            println!("{}", USAGE);
            ExitCode::from(1)
        }
        _ => {
            let _ = err.print();
            ExitCode::from(1)
        }
    }
}
