//! Terminal rendering of dashboard notices and confirmations.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use dashboard_core::{ConfirmPrompt, Notifier};

pub struct ConsoleNotifier {
    assume_yes: bool,
}

impl ConsoleNotifier {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    async fn success(&self, message: &str) {
        println!("ok: {message}");
    }

    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        if self.assume_yes {
            return true;
        }
        if prompt.destructive {
            println!("warning: {}", prompt.title);
        } else {
            println!("{}", prompt.title);
        }
        println!("  {}", prompt.body);
        print!("  {} / {} [y/N]: ", prompt.confirm_label, prompt.cancel_label);
        let _ = io::stdout().flush();

        // Declining is the answer on EOF or a failed read.
        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            match io::stdin().lock().read_line(&mut line) {
                Ok(_) => line,
                Err(_) => String::new(),
            }
        })
        .await
        .unwrap_or_default();

        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}
