use crate::cmd::FingerprintArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_fingerprints, OutputFormat};

pub fn run(args: FingerprintArgs, format: OutputFormat) -> CliResult<i32> {
    print_fingerprints(&args.descriptors, format);
    Ok(SUCCESS)
}
