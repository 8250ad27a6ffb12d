//! In-memory [`AssistantApi`] double driven by a scripted run-state sequence.
//!
//! Each `run_state` call pops the next scripted state; once the script is
//! drained the run reports `in_progress` forever, which lets tests exercise
//! the poll-budget path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::assistant::api::{AssistantApi, AssistantSpec};
use crate::error::BackendError;
use crate::types::{RunState, RunStatus, ToolOutput};

pub struct ScriptedAssistantApi {
    states: Mutex<std::collections::VecDeque<RunState>>,
    final_message: String,
    uploads: AtomicUsize,
    assistants: AtomicUsize,
    threads: AtomicUsize,
    runs: AtomicUsize,
    messages: Mutex<Vec<String>>,
    submitted: Mutex<Vec<Vec<ToolOutput>>>,
}

impl ScriptedAssistantApi {
    /// `states` is consumed in order by `run_state`; `final_message` is what
    /// `latest_message` returns.
    pub fn new(states: Vec<RunState>, final_message: impl Into<String>) -> Self {
        Self {
            states: Mutex::new(states.into()),
            final_message: final_message.into(),
            uploads: AtomicUsize::new(0),
            assistants: AtomicUsize::new(0),
            threads: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn files_uploaded(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn assistants_created(&self) -> usize {
        self.assistants.load(Ordering::SeqCst)
    }

    /// Every user message posted, in order.
    pub fn posted_messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Each element is one `submit_tool_outputs` batch.
    pub fn submitted_outputs(&self) -> Vec<Vec<ToolOutput>> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssistantApi for ScriptedAssistantApi {
    async fn upload_context_file(
        &self,
        _filename: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, BackendError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("file_{}", n))
    }

    async fn create_assistant(&self, _spec: &AssistantSpec) -> Result<String, BackendError> {
        let n = self.assistants.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("asst_{}", n))
    }

    async fn create_thread(&self) -> Result<String, BackendError> {
        let n = self.threads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("thread_{}", n))
    }

    async fn add_user_message(
        &self,
        _thread_id: &str,
        content: &str,
    ) -> Result<(), BackendError> {
        self.messages.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn create_run(
        &self,
        _thread_id: &str,
        _assistant_id: &str,
    ) -> Result<String, BackendError> {
        let n = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("run_{}", n))
    }

    async fn run_state(&self, _thread_id: &str, _run_id: &str) -> Result<RunState, BackendError> {
        Ok(self
            .states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RunState::new(RunStatus::InProgress)))
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        _run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<(), BackendError> {
        self.submitted.lock().unwrap().push(outputs);
        Ok(())
    }

    async fn latest_message(&self, _thread_id: &str) -> Result<String, BackendError> {
        Ok(self.final_message.clone())
    }
}
