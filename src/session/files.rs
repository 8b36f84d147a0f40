//! File management through generated scripts.
//!
//! Results arrive asynchronously as `output` events framed by the
//! `<BEGINREC>` / `<ENDREC>` markers; correlating them with the request is
//! up to the caller.

use tracing::debug;

use crate::error::Result;
use crate::protocol::FileOperation;

use super::Session;
use super::core::ExecutionRequest;
use super::execution::Execution;

// ============================================================================
// Session - File Operations
// ============================================================================

impl Session {
    /// Prints the device's working directory listing.
    ///
    /// Clears the scratch buffer once the connection is claimed.
    pub async fn list_files(&self) -> Result<Execution> {
        self.run_file_operation(FileOperation::List, true).await
    }

    /// Prints the content of `path`.
    ///
    /// Clears the scratch buffer once the connection is claimed. A missing
    /// file shows up as a device traceback in the output.
    pub async fn load_file(&self, path: &str) -> Result<Execution> {
        self.run_file_operation(
            FileOperation::Load {
                path: path.to_string(),
            },
            true,
        )
        .await
    }

    /// Replaces `path` with `content` and publishes `file-saved` once the
    /// script is transmitted.
    ///
    /// Returns `Ok(None)` without touching the device when either argument
    /// is empty.
    pub async fn write_file(&self, path: &str, content: &str) -> Result<Option<Execution>> {
        if path.is_empty() || content.is_empty() {
            debug!(path, content_len = content.len(), "Skipping empty write");
            return Ok(None);
        }

        let operation = FileOperation::Write {
            path: path.to_string(),
            content: content.to_string(),
        };
        debug!(path, content_len = content.len(), "Writing file");

        self.start_execution(ExecutionRequest::new(operation.to_script()).saving(path))
            .await
            .map(Some)
    }

    /// Deletes `path`.
    pub async fn remove_file(&self, path: &str) -> Result<Execution> {
        self.run_file_operation(
            FileOperation::Remove {
                path: path.to_string(),
            },
            false,
        )
        .await
    }

    /// Renames `old_path` to `new_path`.
    pub async fn rename_file(&self, old_path: &str, new_path: &str) -> Result<Execution> {
        self.run_file_operation(
            FileOperation::Rename {
                from: old_path.to_string(),
                to: new_path.to_string(),
            },
            false,
        )
        .await
    }

    async fn run_file_operation(
        &self,
        operation: FileOperation,
        clears_scratch: bool,
    ) -> Result<Execution> {
        debug!(operation = operation.name(), "Running file operation");
        let mut request = ExecutionRequest::new(operation.to_script());
        if clears_scratch {
            request = request.clearing_scratch();
        }
        self.start_execution(request).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::broadcast::{self, error::TryRecvError};

    use crate::error::Error;
    use crate::protocol::script;
    use crate::session::{ExecutionOutcome, SessionEvent, SessionOptions};
    use crate::transport::MemoryTransport;

    async fn open_session() -> (MemoryTransport, Session, broadcast::Receiver<SessionEvent>) {
        let memory = MemoryTransport::new();
        let session = Session::new(SessionOptions::default()).unwrap();
        let mut events = session.subscribe();

        session.open(&memory, "mem0").await.unwrap();
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Connected);
        memory.clear_writes();

        (memory, session, events)
    }

    fn written_text(memory: &MemoryTransport) -> String {
        String::from_utf8(memory.written_bytes()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_file_emits_file_saved_after_finish() {
        let (memory, session, mut events) = open_session().await;

        let execution = session.write_file("/a.txt", "x\r\ny").await.unwrap().unwrap();
        let id = execution.id();
        assert_eq!(execution.wait().await.unwrap(), ExecutionOutcome::Finished);

        assert_eq!(events.recv().await.unwrap(), SessionEvent::ExecutionStarted { id });
        assert_eq!(events.recv().await.unwrap(), SessionEvent::ExecutionFinished { id });
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::FileSaved {
                path: "/a.txt".into()
            }
        );

        let written = written_text(&memory);
        assert!(written.contains(&script::write_file_script("/a.txt", "x\r\ny")));
    }

    #[tokio::test]
    async fn test_write_file_empty_arguments_are_noops() {
        let (memory, session, mut events) = open_session().await;

        assert!(session.write_file("/a.txt", "").await.unwrap().is_none());
        assert!(session.write_file("", "content").await.unwrap().is_none());

        assert!(memory.writes().is_empty());
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
        assert!(!session.is_executing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_saved_not_carried_to_next_execution() {
        let (_memory, session, mut events) = open_session().await;

        let write = session
            .write_file("/big.txt", &"line\r\n".repeat(200))
            .await
            .unwrap()
            .unwrap();
        write.cancel();
        assert_eq!(write.wait().await.unwrap(), ExecutionOutcome::Cancelled);

        let next = session.execute("print(1)").await.unwrap();
        assert_eq!(next.wait().await.unwrap(), ExecutionOutcome::Finished);

        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, SessionEvent::FileSaved { .. }));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_files_clears_scratch() {
        let (memory, session, mut events) = open_session().await;

        memory.push_data(b"noise");
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Output { .. }
        ));
        assert_eq!(session.scratch(), "noise");

        let execution = session.list_files().await.unwrap();
        assert_eq!(session.scratch(), "");
        execution.wait().await.unwrap();

        assert!(written_text(&memory).contains("print(os.listdir())"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_list_files_keeps_scratch() {
        let (memory, session, mut events) = open_session().await;

        let running = session.execute(&"a".repeat(2000)).await.unwrap();
        memory.push_data(b"partial output");
        loop {
            if let SessionEvent::Output { .. } = events.recv().await.unwrap() {
                break;
            }
        }

        assert!(matches!(
            session.list_files().await,
            Err(Error::Busy { .. })
        ));
        assert!(matches!(
            session.load_file("/main.py").await,
            Err(Error::Busy { .. })
        ));
        assert_eq!(session.scratch(), "partial output");

        running.wait().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_remove_rename_scripts() {
        let (memory, session, _events) = open_session().await;

        session.load_file("/main.py").await.unwrap().wait().await.unwrap();
        session.remove_file("/old.py").await.unwrap().wait().await.unwrap();
        session
            .rename_file("/a.py", "/b.py")
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        let written = written_text(&memory);
        assert!(written.contains(&script::load_file_script("/main.py")));
        assert!(written.contains(&script::remove_file_script("/old.py")));
        assert!(written.contains(&script::rename_file_script("/a.py", "/b.py")));
    }

    #[tokio::test]
    async fn test_file_operations_require_connection() {
        let session = Session::new(SessionOptions::default()).unwrap();
        assert!(matches!(
            session.list_files().await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            session.write_file("/a", "b").await,
            Err(Error::NotConnected)
        ));
    }
}
