use std::io::{self, Write};

use async_trait::async_trait;

/// Interactive source of login details.
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn username(&self) -> io::Result<String>;
    async fn password(&self) -> io::Result<String>;
    async fn two_factor_code(&self) -> io::Result<String>;
}

/// Reads from the controlling terminal. The password is read without echo.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn username(&self) -> io::Result<String> {
        blocking(|| read_line("Blink username (email): ")).await
    }

    async fn password(&self) -> io::Result<String> {
        blocking(|| rpassword::prompt_password("Blink password: ")).await
    }

    async fn two_factor_code(&self) -> io::Result<String> {
        blocking(|| read_line("Enter the 2FA pin sent to your registered device/email: ")).await
    }
}

// Stdin reads run on the blocking pool so an interrupt can still be
// observed by the task waiting on the prompt.
async fn blocking<F>(f: F) -> io::Result<String>
where
    F: FnOnce() -> io::Result<String> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(io::Error::other)?
}

fn read_line(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
