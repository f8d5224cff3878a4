//! `check-cookie` — evaluate the cookie policy for one request.

use crate::config::Settings;
use crate::engine::FilterRequest;
use crate::policy::audit::DecisionLog;
use crate::policy::cookies;
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct CheckCookieArgs {
    /// First-party (top-level page) URL.
    #[arg(long)]
    pub first_party: String,

    /// URL of the origin attempting to set the cookie.
    #[arg(long)]
    pub origin: String,

    /// Treat the request as third-party.
    #[arg(long)]
    pub third_party: bool,

    /// Machine-readable output.
    #[arg(long)]
    pub json: bool,

    /// Append the decision to the JSONL decision log.
    #[arg(long)]
    pub audit: bool,
}

pub fn run(settings: Settings, args: CheckCookieArgs) -> Result<()> {
    let request = FilterRequest::new(&args.first_party, &args.origin, args.third_party);
    let setting = settings
        .cookies
        .accept_for_url(request.first_party_url.as_ref());
    let accepted = cookies::accept_cookie(&settings, &request);

    if args.audit {
        DecisionLog::default_log()?.record(&request, setting, accepted)?;
    }

    if args.json {
        println!(
            "{}",
            serde_json::json!({
                "first_party": args.first_party,
                "origin": args.origin,
                "third_party": args.third_party,
                "setting": setting.to_string(),
                "accepted": accepted,
            })
        );
    } else {
        let verdict = if accepted { "accept" } else { "reject" };
        println!("{verdict} (effective setting: {setting})");
    }
    Ok(())
}
