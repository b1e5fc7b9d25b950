//! Consent prompters selected by `[consent] policy`.

use std::io::{BufRead, Write};
use std::sync::Arc;

use async_trait::async_trait;
use desklet_config::schema::ConsentPolicy;
use desklet_manager::{ConsentKind, ConsentPrompter, ConsentRequest, FixedPrompter};
use tokio::sync::Mutex;
use tracing::warn;

pub fn prompter_for(policy: ConsentPolicy) -> Arc<dyn ConsentPrompter> {
    match policy {
        ConsentPolicy::Ask => Arc::new(TerminalPrompter::default()),
        ConsentPolicy::Allow => Arc::new(FixedPrompter { grant: true }),
        ConsentPolicy::Deny => Arc::new(FixedPrompter { grant: false }),
    }
}

/// Asks on the controlling terminal, one question at a time.
#[derive(Default)]
pub struct TerminalPrompter {
    turn: Mutex<()>,
}

pub fn question(request: &ConsentRequest) -> String {
    let what = match request.kind {
        ConsentKind::Web => "load web content",
        ConsentKind::Backend => "run its backend process",
    };
    format!(
        "Allow widget '{}' (instance {}) to {what}? [y/N] ",
        request.widget_id, request.instance_id
    )
}

/// `y`/`yes` in any case grants; everything else refuses.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[async_trait]
impl ConsentPrompter for TerminalPrompter {
    async fn ask(&self, request: &ConsentRequest) -> bool {
        let _turn = self.turn.lock().await;
        let prompt = question(request);
        let answer = tokio::task::spawn_blocking(move || {
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "{prompt}");
            let _ = stderr.flush();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_yes(&line),
            Ok(Err(e)) => {
                warn!(error = %e, "Could not read consent answer; refusing");
                false
            }
            Err(e) => {
                warn!(error = %e, "Consent prompt task failed; refusing");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desklet_common::InstanceId;

    #[test]
    fn only_yes_grants() {
        assert!(is_yes("y\n"));
        assert!(is_yes("  YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn question_names_widget_and_kind() {
        let request = ConsentRequest {
            instance_id: InstanceId::from("abc"),
            widget_id: "weather".into(),
            kind: ConsentKind::Backend,
        };
        let q = question(&request);
        assert!(q.contains("'weather'"));
        assert!(q.contains("abc"));
        assert!(q.contains("backend process"));
    }

    #[tokio::test]
    async fn fixed_policies_answer_without_asking() {
        let request = ConsentRequest {
            instance_id: InstanceId::from("abc"),
            widget_id: "clock".into(),
            kind: ConsentKind::Web,
        };
        assert!(prompter_for(ConsentPolicy::Allow).ask(&request).await);
        assert!(!prompter_for(ConsentPolicy::Deny).ask(&request).await);
    }
}
