use gumdrop::Options;

#[derive(Debug, Options, Clone)]
pub struct ServerOpts {
    help: bool,
    #[options(command)]
    pub command: Option<Command>,
}

// The supported commands
#[derive(Debug, Options, Clone)]
pub enum Command {
    #[options(help = "serves P0's side of the DKG over HTTP")]
    Serve(ServeOpts),

    #[options(help = "prints the configuration the server would run with")]
    PrintConfig(PrintConfigOpts),
}

#[derive(Debug, Options, Clone, Default)]
pub struct ServeOpts {
    help: bool,

    #[options(help = "path to a TOML config file (defaults are used if none provided)")]
    pub config: Option<String>,

    #[options(no_short, help = "the address to listen on, overrides the config file")]
    pub host: Option<String>,

    #[options(help = "the port to listen on, overrides the config file")]
    pub port: Option<u16>,

    #[options(help = "log at debug level unless RUST_LOG is set")]
    pub verbose: bool,
}

#[derive(Debug, Options, Clone, Default)]
pub struct PrintConfigOpts {
    help: bool,

    #[options(help = "path to a TOML config file")]
    pub config: Option<String>,
}
