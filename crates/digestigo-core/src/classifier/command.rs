//! Command Classifier
//!
//! 外部コマンド（デフォルトはClaude CLI）を使った`Classifier`実装。
//!
//! ### 完全な使用例（外部依存あり）
//!
//! ```rust,ignore
//! use digestigo_core::classifier::{ClassificationRequestBuilder, Classifier, CommandClassifier};
//!
//! let classifier = CommandClassifier::new("claude", vec!["--print".into()]);
//! if classifier.is_available().await {
//!     let request = ClassificationRequestBuilder::default().build_request("I ate bread");
//!     let reply = classifier.complete(&request).await?;
//!     println!("{}", reply);
//! }
//! ```

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{DigestigoError, Result};

use super::{Classifier, ClassifierRequest};

/// プロンプトを標準入力に渡し、標準出力を応答とする分類器
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    program: String,
    args: Vec<String>,
}

impl CommandClassifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// コマンドが利用可能かチェック
    ///
    /// `<program> --version` を実行して成功すればtrue
    pub async fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Classifier for CommandClassifier {
    fn name(&self) -> &str {
        &self.program
    }

    async fn complete(&self, request: &ClassifierRequest) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| DigestigoError::ClassifierUnavailable {
                message: format!("Failed to spawn {}: {}", self.program, e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.render_text().as_bytes())
                .await
                .map_err(|e| DigestigoError::ClassifierUnavailable {
                    message: format!("Failed to write prompt: {}", e),
                })?;
        }

        let output =
            child
                .wait_with_output()
                .await
                .map_err(|e| DigestigoError::ClassifierUnavailable {
                    message: format!("Execution failed: {}", e),
                })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DigestigoError::ClassifierUnavailable {
                message: format!("{} exited with error: {}", self.program, stderr.trim()),
            });
        }

        let reply = String::from_utf8_lossy(&output.stdout).to_string();
        debug!(classifier = %self.program, bytes = reply.len(), "Classifier replied");
        Ok(reply)
    }
}
