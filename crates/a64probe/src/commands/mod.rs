//! Command implementations.

mod analyze;
mod decode;
mod eval_switch;
mod find_call;

use tracing::error;

use a64probe_image::CodeImage;

use crate::cli::{Cli, Commands, EXIT_FAILURE, EXIT_SUCCESS, ImageArgs};

/// Dispatch the parsed command line, returning the process exit code.
pub fn run_command(cli: &Cli) -> i32 {
    let result = match &cli.command {
        Commands::Decode { image, addr, count } => {
            load(image).and_then(|img| decode::run(&img, *addr, *count))
        }
        Commands::Analyze { image, entry, merge } => {
            load(image).and_then(|img| analyze::run(&img, *entry, (*merge).into()))
        }
        Commands::FindCall {
            image,
            start,
            nth,
            rets,
            bytes,
            include_indirect,
        } => load(image)
            .and_then(|img| find_call::run(&img, *start, *nth, *rets, *bytes, *include_indirect)),
        Commands::EvalSwitch {
            image,
            start,
            pc_rel_n,
            offset_n,
            case,
        } => load(image)
            .and_then(|img| eval_switch::run(&img, *start, *pc_rel_n, *offset_n, *case)),
    };

    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(message) => {
            error!("{message}");
            EXIT_FAILURE
        }
    }
}

fn load(args: &ImageArgs) -> Result<CodeImage, String> {
    CodeImage::from_file(&args.input, args.base).map_err(|e| e.to_string())
}
