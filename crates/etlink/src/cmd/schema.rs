use crate::cmd::{load_schema, SchemaArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_schema, OutputFormat};

pub fn run(args: SchemaArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = load_schema(&args.file)?;
    print_schema(&schema, format);
    Ok(SUCCESS)
}
