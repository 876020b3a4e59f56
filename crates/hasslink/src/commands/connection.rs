//! `hasslink test`: check the server answers and accepts the token.

use serde::Serialize;

use crate::cli::GlobalOpts;
use crate::config::Target;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Probe {
    profile: String,
    url: String,
    message: String,
}

pub async fn handle(target: &Target, global: &GlobalOpts) -> Result<(), CliError> {
    let url = target.sync.server.base_url()?.to_string();
    let client = super::client(target)?;
    let message = client.test_connection().await?;

    let probe = Probe {
        profile: target.profile_name.clone(),
        url,
        message,
    };
    let out = output::render_single(
        global.output,
        &probe,
        |p| format!("✓ {} ({}): {}", p.url, p.profile, p.message),
        |p| p.message.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
