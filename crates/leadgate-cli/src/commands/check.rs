use leadgate_auth::{Decision, RequestParts, TokenStatus};
use leadgate_runtime::LeadgateRuntime;

/// Run the gate for one path offline and print the decision.
pub fn cmd_check(
    runtime: &LeadgateRuntime,
    path: &str,
    cookie: Option<&str>,
    bearer: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let cookie_header = cookie.map(|t| format!("{}={t}", runtime.issuer().cookie_name()));
    let authorization = bearer.map(|t| format!("Bearer {t}"));

    let mut req = RequestParts::new(path);
    if let Some(c) = cookie_header.as_deref() {
        req = req.with_cookie_header(c);
    }
    if let Some(a) = authorization.as_deref() {
        req = req.with_authorization(a);
    }

    let decision = runtime.evaluate(&req);
    crate::pout(json, report(path, &decision), &describe(path, &decision))
}

fn token_label(status: TokenStatus) -> String {
    match status {
        TokenStatus::Absent => "absent".to_string(),
        TokenStatus::Valid(ch) => format!("valid ({ch})"),
        TokenStatus::Rejected(ch) => format!("rejected ({ch})"),
    }
}

fn report(path: &str, d: &Decision) -> serde_json::Value {
    serde_json::json!({
        "path": path,
        "route": d.route.map(|r| r.as_str()).unwrap_or("excluded"),
        "outcome": d.outcome.as_str(),
        "location": d.outcome.location(),
        "token": token_label(d.token),
        "subject": d.session.as_ref().map(|c| c.subject_id()),
        "tenant": d.tenant_scope().map(|s| s.tenant_id().to_string()),
    })
}

fn describe(path: &str, d: &Decision) -> String {
    let mut out = format!(
        "{path}\n  route:   {}\n  token:   {}\n  outcome: {}",
        d.route.map(|r| r.as_str()).unwrap_or("excluded"),
        token_label(d.token),
        d.outcome.as_str(),
    );
    if let Some(loc) = d.outcome.location() {
        out.push_str(&format!("\n  location: {loc}"));
    }
    out
}
