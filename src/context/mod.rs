//! Orchestration of the merge stages.
//!
//! A [`ConfigContext`] holds registered targets. `init` runs the stages in
//! priority order over one shared tree:
//!
//! 1. Build: each target's current value is encoded under its path at
//!    [`priority::BUILD`]
//! 2. Merge: the config file, if any, is parsed in at [`priority::MERGE`]
//! 3. Cmd: `-D` properties are applied at [`priority::CMD`]
//!
//! Each target is then decoded from its subtree on its own thread, and its
//! callback is told how that went.

mod options;
mod report;

use std::any::Any;
use std::fmt;
use std::fs;
use std::io::Read;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread;

use cfgm_json::Dumper;
use cfgm_tree::{Node, Reader, Walker};
use chrono::Utc;
use tracing::{debug, warn};

use crate::codec::{encode_into, CodecError, Decode, Decoder, Encode};
use crate::error::{dedup_errors, Error};
use crate::property::{parse_command_line, PropertyTree};

pub use options::{ContextOptions, DEFAULT_COMMAND_LINE_PREFIX, DEFAULT_CONFIG_FILE_PREFIX};
pub use report::{digest, ConfigSource, InitReport, SourceOrigin};

/// Priority stamps of the merge stages.
pub mod priority {
    use cfgm_tree::ModifyTime;

    pub const BUILD: ModifyTime = ModifyTime(1);
    pub const MERGE: ModifyTime = ModifyTime(2);
    /// Reserved for an environment-variable layer; no stage writes it.
    pub const ENV: ModifyTime = ModifyTime(3);
    pub const CMD: ModifyTime = ModifyTime(4);
}

/// Completion callback. Receives the error that affected its target, if
/// any, and returns the error to report from `init`.
pub type Callback = Box<dyn FnOnce(Option<&Error>) -> Result<(), Error> + Send>;

const READER_SOURCE: &str = "<reader>";

/// A registered value, type-erased.
trait Target: Send {
    fn encode(&self, walker: &mut Walker<'_>) -> Result<(), CodecError>;
    fn decode(&self, reader: &mut Reader<'_>, decoder: &Decoder) -> Result<(), CodecError>;
}

impl<T: Encode + Decode + Send> Target for Arc<Mutex<T>> {
    fn encode(&self, walker: &mut Walker<'_>) -> Result<(), CodecError> {
        let value = self.lock().unwrap_or_else(PoisonError::into_inner);
        encode_into(walker, &*value)
    }

    fn decode(&self, reader: &mut Reader<'_>, decoder: &Decoder) -> Result<(), CodecError> {
        let mut value = self.lock().unwrap_or_else(PoisonError::into_inner);
        decoder.decode(&mut *value, reader)
    }
}

struct Registration {
    path: Vec<String>,
    target: Box<dyn Target>,
    callback: Callback,
}

impl Registration {
    fn resolve(self, root: &Node, outcome: Option<Error>) -> Result<(), Error> {
        if let Some(error) = outcome {
            return (self.callback)(Some(&error));
        }

        let mut reader = Reader::new(root);
        for key in &self.path {
            if !reader.try_enter_obj(key) {
                debug!(path = %self.path.join("."), "registered path missing after merge");
                return (self.callback)(None);
            }
        }

        match self.target.decode(&mut reader, &Decoder::new(priority::BUILD)) {
            Ok(()) => (self.callback)(None),
            Err(error) => (self.callback)(Some(&Error::from(error))),
        }
    }
}

/// Registered targets plus the tree they were merged through.
pub struct ConfigContext {
    options: ContextOptions,
    root: Node,
    registrations: Vec<Registration>,
    report: Option<InitReport>,
}

impl fmt::Debug for ConfigContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigContext")
            .field("options", &self.options)
            .field("pending", &self.registrations.len())
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl Default for ConfigContext {
    fn default() -> Self {
        Self::new(ContextOptions::default())
    }
}

impl ConfigContext {
    pub fn new(options: ContextOptions) -> Self {
        Self {
            options: options.normalized(),
            root: Node::new(),
            registrations: Vec::new(),
            report: None,
        }
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Register `target` under the dotted `path`; an empty path is the root.
    ///
    /// The value held by `target` when `init` runs supplies the defaults,
    /// and is overwritten in place with the merged result.
    pub fn register<T, F>(&mut self, path: &str, target: Arc<Mutex<T>>, callback: F)
    where
        T: Encode + Decode + Send + 'static,
        F: FnOnce(Option<&Error>) -> Result<(), Error> + Send + 'static,
    {
        let path = if path.is_empty() {
            Vec::new()
        } else {
            path.split('.').map(str::to_owned).collect()
        };
        self.registrations.push(Registration {
            path,
            target: Box::new(target),
            callback: Box::new(callback),
        });
    }

    /// Number of registrations waiting for the next `init`.
    pub fn pending(&self) -> usize {
        self.registrations.len()
    }

    /// Run every stage, taking the config file and properties from `args`.
    ///
    /// Each call starts from an empty tree and consumes the registrations
    /// made since the previous call. Returns the distinct errors returned by
    /// the callbacks; with nothing registered, a failed stage's own error.
    pub fn init_from_args<I, S>(&mut self, args: I) -> Vec<Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        self.run(move |ctx, sources| {
            let command_line = parse_command_line(
                &args,
                &ctx.options.config_file_prefix,
                &ctx.options.command_line_prefix,
            )?;
            if let Some(path) = &command_line.config_file {
                let bytes = read_config_file(path)?;
                ctx.merge_bytes(Some(path.as_str()), &bytes, sources)?;
            }
            ctx.apply_properties(&command_line.properties, sources)
        })
    }

    /// Run every stage with an already-opened config document.
    pub fn init_with<R: Read>(&mut self, file: Option<R>, properties: &PropertyTree) -> Vec<Error> {
        self.run(|ctx, sources| {
            if let Some(mut reader) = file {
                let mut bytes = Vec::new();
                reader
                    .read_to_end(&mut bytes)
                    .map_err(|e| Error::io(READER_SOURCE, e))?;
                ctx.merge_bytes(None, &bytes, sources)?;
            }
            ctx.apply_properties(properties, sources)
        })
    }

    fn run<F>(&mut self, stages: F) -> Vec<Error>
    where
        F: FnOnce(&mut Self, &mut Vec<ConfigSource>) -> Result<(), Error>,
    {
        self.root = Node::new();
        let mut sources = vec![ConfigSource {
            origin: SourceOrigin::Build,
            priority: priority::BUILD.0,
            path: None,
            digest: None,
        }];

        debug!(
            registrations = self.registrations.len(),
            priority = %priority::BUILD,
            "building tree from defaults"
        );
        let mut outcomes = self.build();

        let failed = outcomes.iter().filter(|o| o.is_some()).count();
        if failed == 0 {
            if let Err(error) = stages(self, &mut sources) {
                if outcomes.is_empty() {
                    warn!(%error, "stage failed with nothing registered");
                    return self.finish(sources, vec![error]);
                }
                warn!(%error, "stage failed, notifying every callback");
                outcomes = vec![Some(error); outcomes.len()];
            }
        } else {
            warn!(failed, "encoding failed, skipping file and properties");
        }

        let errors = self.resolve(outcomes);
        self.finish(sources, errors)
    }

    fn finish(&mut self, sources: Vec<ConfigSource>, errors: Vec<Error>) -> Vec<Error> {
        self.report = Some(InitReport {
            created_at: Utc::now(),
            sources,
            errors: errors.iter().map(ToString::to_string).collect(),
        });
        errors
    }

    fn build(&mut self) -> Vec<Option<Error>> {
        let mut outcomes = Vec::with_capacity(self.registrations.len());
        for registration in &self.registrations {
            let mut walker = Walker::new(&mut self.root, priority::BUILD);
            for key in &registration.path {
                walker.enter_obj(key);
            }
            outcomes.push(registration.target.encode(&mut walker).err().map(Error::from));
        }
        outcomes
    }

    fn merge_bytes(
        &mut self,
        path: Option<&str>,
        bytes: &[u8],
        sources: &mut Vec<ConfigSource>,
    ) -> Result<(), Error> {
        let digest = digest(bytes);
        debug!(
            path = path.unwrap_or(READER_SOURCE),
            len = bytes.len(),
            %digest,
            priority = %priority::MERGE,
            "merging config file"
        );
        cfgm_json::merge(&mut self.root, bytes, priority::MERGE)?;
        sources.push(ConfigSource {
            origin: SourceOrigin::File,
            priority: priority::MERGE.0,
            path: path.map(str::to_owned),
            digest: Some(digest),
        });
        Ok(())
    }

    fn apply_properties(
        &mut self,
        properties: &PropertyTree,
        sources: &mut Vec<ConfigSource>,
    ) -> Result<(), Error> {
        if properties.is_empty() {
            return Ok(());
        }
        debug!(priority = %priority::CMD, "applying command-line properties");
        properties.apply(&mut self.root, priority::CMD)?;
        sources.push(ConfigSource {
            origin: SourceOrigin::Cmd,
            priority: priority::CMD.0,
            path: None,
            digest: None,
        });
        Ok(())
    }

    /// Decode every registration in parallel and collect callback errors.
    fn resolve(&mut self, outcomes: Vec<Option<Error>>) -> Vec<Error> {
        let registrations = std::mem::take(&mut self.registrations);
        let root = &self.root;
        let results: Vec<Result<(), Error>> = thread::scope(|scope| {
            let handles: Vec<_> = registrations
                .into_iter()
                .zip(outcomes)
                .map(|(registration, outcome)| {
                    let path = registration.path.join(".");
                    (path, scope.spawn(move || registration.resolve(root, outcome)))
                })
                .collect();
            handles
                .into_iter()
                .map(|(path, handle)| {
                    handle.join().unwrap_or_else(|payload| {
                        let message = panic_message(&*payload);
                        warn!(%path, %message, "registration panicked");
                        Err(Error::Panicked { path, message })
                    })
                })
                .collect()
        });
        dedup_errors(results.into_iter().filter_map(Result::err))
    }

    /// The merged tree.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Render the merged tree as annotated relaxed JSON.
    pub fn dump(&self) -> String {
        Dumper::new()
            .with_prototype_label(self.options.prototype_label.clone())
            .dump(&self.root)
    }

    /// Report of the last `init`, if one has run.
    pub fn report(&self) -> Option<&InitReport> {
        self.report.as_ref()
    }

    /// The subtree at a dotted path, as plain JSON.
    ///
    /// Numeric segments index into lists.
    pub fn get_value(&self, path: &str) -> Option<serde_json::Value> {
        let mut reader = Reader::new(&self.root);
        enter_path(&mut reader, path).then(|| reader.node().to_json_value())
    }

    /// Decode the subtree at a dotted path into a fresh `T`.
    pub fn get<T: Decode + Default>(&self, path: &str) -> Result<Option<T>, Error> {
        let mut reader = Reader::new(&self.root);
        if !enter_path(&mut reader, path) {
            return Ok(None);
        }
        let mut value = T::default();
        Decoder::full().decode(&mut value, &mut reader)?;
        Ok(Some(value))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

fn enter_path(reader: &mut Reader<'_>, path: &str) -> bool {
    if path.is_empty() {
        return true;
    }
    path.split('.').all(|key| {
        reader.try_enter_obj(key)
            || key
                .parse::<usize>()
                .is_ok_and(|index| reader.try_enter_list(index))
    })
}

fn read_config_file(path: &str) -> Result<Vec<u8>, Error> {
    if !path.ends_with(".json") {
        return Err(Error::UnsupportedFileType {
            path: path.to_owned(),
        });
    }
    fs::read(path).map_err(|e| Error::io(path, e))
}

fn default_context() -> &'static Mutex<ConfigContext> {
    static CONTEXT: OnceLock<Mutex<ConfigContext>> = OnceLock::new();
    CONTEXT.get_or_init(|| Mutex::new(ConfigContext::default()))
}

/// Register `target` with the process-wide context.
pub fn register<T, F>(path: &str, target: Arc<Mutex<T>>, callback: F)
where
    T: Encode + Decode + Send + 'static,
    F: FnOnce(Option<&Error>) -> Result<(), Error> + Send + 'static,
{
    default_context()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .register(path, target, callback);
}

/// Initialize the process-wide context from the process arguments.
pub fn init() -> Vec<Error> {
    default_context()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .init_from_args(std::env::args().skip(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyError;
    use std::collections::BTreeMap;

    fn shared<T>(value: T) -> Arc<Mutex<T>> {
        Arc::new(Mutex::new(value))
    }

    fn ok(_: Option<&Error>) -> Result<(), Error> {
        Ok(())
    }

    #[test]
    fn test_stage_order_and_report() {
        let port = shared(8080i64);
        let mut ctx = ConfigContext::default();
        ctx.register("server.port", port.clone(), ok);
        let properties = PropertyTree::from_properties(["server.port=9000"]).unwrap();
        let errors = ctx.init_with(Some(&br#"{"server": {"port": 81}}"#[..]), &properties);
        assert!(errors.is_empty());
        assert_eq!(*port.lock().unwrap(), 9000);

        let report = ctx.report().unwrap();
        let origins: Vec<_> = report.sources.iter().map(|s| s.origin).collect();
        assert_eq!(
            origins,
            vec![SourceOrigin::Build, SourceOrigin::File, SourceOrigin::Cmd]
        );
        assert_eq!(report.sources[1].digest.as_deref().map(str::len), Some(64));
        assert_eq!(ctx.pending(), 0);
    }

    #[test]
    fn test_property_error_reaches_every_callback() {
        let seen = shared(Vec::new());
        let mut ctx = ConfigContext::default();
        for path in ["a", "b"] {
            let seen = seen.clone();
            ctx.register(path, shared(0i64), move |error| {
                seen.lock().unwrap().push(error.cloned());
                Err(error.cloned().unwrap_or_else(|| Error::callback("no error")))
            });
        }
        let errors = ctx.init_from_args(["-Da=1", "-Da=2"]);
        let expected = Error::Property(PropertyError::Conflict { path: "a".into() });
        assert_eq!(errors, vec![expected.clone()]);
        assert_eq!(*seen.lock().unwrap(), vec![Some(expected.clone()), Some(expected)]);
    }

    #[test]
    fn test_get_and_get_value() {
        let mut ctx = ConfigContext::default();
        ctx.register("limits", shared(BTreeMap::from([("a".to_string(), 1i64)])), ok);
        assert!(ctx.init_from_args(["-Dlimits.b=2"]).is_empty());

        // value maps are replaced by a later stage, not merged
        assert_eq!(ctx.get_value("limits"), Some(serde_json::json!({"b": 2})));
        assert_eq!(ctx.get_value("limits.a"), None);
        let limits: BTreeMap<String, i64> = ctx.get("limits").unwrap().unwrap();
        assert_eq!(limits, BTreeMap::from([("b".to_string(), 2)]));
        assert_eq!(ctx.get::<i64>("missing").unwrap(), None);
    }

    #[test]
    fn test_panicking_callback_only_fails_itself() {
        let other = shared(0i64);
        let mut ctx = ConfigContext::default();
        ctx.register("a.b", shared(0i64), |_| panic!("callback exploded"));
        ctx.register("other", other.clone(), ok);

        let errors = ctx.init_from_args(["-Dother=5"]);
        assert_eq!(
            errors,
            vec![Error::Panicked {
                path: "a.b".into(),
                message: "callback exploded".into(),
            }]
        );
        assert_eq!(*other.lock().unwrap(), 5);
    }

    #[test]
    fn test_empty_path_registers_at_root() {
        let value = shared(3i64);
        let mut ctx = ConfigContext::default();
        ctx.register("", value.clone(), ok);
        assert!(ctx.init_with(Some(&b"7"[..]), &PropertyTree::new()).is_empty());
        assert_eq!(*value.lock().unwrap(), 7);
    }
}
