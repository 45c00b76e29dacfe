//! cfgm - layered configuration merge
//!
//! Configuration values come from three layers, lowest priority first:
//! compiled-in defaults (the registered values themselves), a relaxed JSON
//! config file, and `-D` command-line properties. All three are merged
//! through one value tree, then projected back onto the registered values.
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Debug, Default)]
//! struct Server {
//!     host: String,
//!     port: u16,
//! }
//!
//! cfgm::record!(Server {
//!     host as "Host",
//!     port as "Port": "listening port",
//! });
//!
//! let server = Arc::new(Mutex::new(Server {
//!     host: "localhost".into(),
//!     port: 8080,
//! }));
//! let mut ctx = cfgm::ConfigContext::default();
//! ctx.register("server", server.clone(), |_| Ok(()));
//! let errors = ctx.init_from_args(["--config=app.json", "-Dserver.Port=9090"]);
//! assert!(errors.is_empty());
//! ```

pub mod codec;
pub mod context;
pub mod error;
pub mod property;

pub use cfgm_json as json;
pub use cfgm_tree as tree;

pub use codec::{build_from, refill, CodecError, Decode, Decoder, Encode, ProtoMap, ProtoVec, Schema};
pub use context::{
    init, priority, register, Callback, ConfigContext, ConfigSource, ContextOptions, InitReport,
    SourceOrigin,
};
pub use error::Error;
pub use property::{parse_command_line, CommandLine, PropertyError, PropertyTree};
