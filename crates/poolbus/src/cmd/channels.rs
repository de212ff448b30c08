use poolbus_device::new_decoder;

use crate::cmd::ChannelsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_schema, OutputFormat};

pub fn run(args: ChannelsArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = new_decoder(args.family).channel_schema();
    print_schema(args.family, &schema, format);
    Ok(SUCCESS)
}
