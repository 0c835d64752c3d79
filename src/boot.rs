use socks_client::config::{parse_args, ClientConfig, Command};

use std::io;


/// Sets up logging and reads the configuration. `None` when there is
/// nothing to run (help was printed).
pub fn boot_client() -> io::Result<Option<ClientConfig>> {
    // 默认日志等级 info, RUST_LOG 优先
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "socks-client".to_owned());

    match parse_args(&program, args)? {
        Command::Help(usage) => {
            print!("{}", usage);
            Ok(None)
        }
        Command::Run(config) => {
            debug!("{:?}", config);
            Ok(Some(config))
        }
    }
}
