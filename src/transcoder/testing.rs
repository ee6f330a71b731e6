//! In-memory transcoder for pipeline tests

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::EngineError;
use crate::transcoder::Transcoder;

type FailRule = Box<dyn Fn(&[String]) -> Option<String> + Send + Sync>;

/// Namespace held in a map; invocations "succeed" by writing the last
/// argument as output, unless a failure rule matches.
pub(crate) struct ScriptedTranscoder {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    invocations: Mutex<Vec<Vec<String>>>,
    init_calls: AtomicUsize,
    init_error: Option<String>,
    fail_rule: Option<FailRule>,
    undeletable: HashSet<String>,
}

impl ScriptedTranscoder {
    pub(crate) fn new() -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
            invocations: Mutex::new(Vec::new()),
            init_calls: AtomicUsize::new(0),
            init_error: None,
            fail_rule: None,
            undeletable: HashSet::new(),
        }
    }

    pub(crate) fn failing_init(reason: &str) -> Self {
        Self {
            init_error: Some(reason.to_string()),
            ..Self::new()
        }
    }

    /// Fail any invocation for which `rule` returns a message
    pub(crate) fn with_fail_rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&[String]) -> Option<String> + Send + Sync + 'static,
    {
        self.fail_rule = Some(Box::new(rule));
        self
    }

    /// Make `remove` fail for names starting with `prefix`
    pub(crate) fn with_undeletable(mut self, prefix: &str) -> Self {
        self.undeletable.insert(prefix.to_string());
        self
    }

    pub(crate) fn resident_names(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub(crate) fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().unwrap().clone()
    }

    pub(crate) fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }
}

impl Transcoder for ScriptedTranscoder {
    async fn initialize(&self) -> Result<(), EngineError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        match &self.init_error {
            Some(reason) => Err(EngineError::InitializationFailed { reason: reason.clone() }),
            None => Ok(()),
        }
    }

    async fn stage(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        self.files.lock().unwrap().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn invoke(&self, arguments: &[String]) -> Result<(), EngineError> {
        self.invocations.lock().unwrap().push(arguments.to_vec());

        let mut files = self.files.lock().unwrap();
        for input in arguments.windows(2).filter(|pair| pair[0] == "-i") {
            if !files.contains_key(&input[1]) {
                return Err(EngineError::InvocationFailed {
                    reason: format!("{}: No such file or directory", input[1]),
                });
            }
        }

        if let Some(reason) = self.fail_rule.as_ref().and_then(|rule| rule(arguments)) {
            return Err(EngineError::InvocationFailed { reason });
        }

        let output = arguments.last().cloned().unwrap_or_default();
        let contents = format!("rendered:{}", arguments.join(" ")).into_bytes();
        files.insert(output, contents);
        Ok(())
    }

    async fn retrieve(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::RetrieveFailed {
                name: name.to_string(),
                reason: "not found".to_string(),
            })
    }

    async fn remove(&self, name: &str) -> Result<(), EngineError> {
        if self.undeletable.iter().any(|prefix| name.starts_with(prefix.as_str())) {
            return Err(EngineError::RemoveFailed {
                name: name.to_string(),
                reason: "permission denied".to_string(),
            });
        }
        self.files.lock().unwrap().remove(name);
        Ok(())
    }
}
