use clap::Args;
use serthru::{SerialPortDevice, StopFlag, error::ThruResult};

#[derive(Args, Debug, Clone)]
pub(crate) struct RunOptions {
    /// `reader`, `writer` or `dump`, plus settings such as `baudrate=115200`,
    /// `port=/dev/ttyUSB0`, `parity=N`, `stopbits=1`, `timeout=2.5`,
    /// `total=1000000`, `granularity=40000`, `wrap=949`, `idle=1`, `progress`,
    /// `out=payload.bin`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ROLE|KEY=VALUE")]
    tokens: Vec<String>,
}

pub(crate) fn handle_run(opts: RunOptions) -> ThruResult<()> {
    // Ctrl-C ends the loop between device calls so the port is still closed
    // and the counters still printed
    let stop = StopFlag::on_termination()?;
    let summary = serthru::dispatch(opts.tokens.as_slice(), SerialPortDevice::open, &stop)?;
    println!("{}", summary);

    Ok(())
}
