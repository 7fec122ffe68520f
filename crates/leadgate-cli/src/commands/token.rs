use clap::Subcommand;
use leadgate_auth::{SessionClaims, SessionSubject, TokenCodec};
use leadgate_runtime::LeadgateRuntime;

#[derive(Debug, Subcommand)]
pub enum TokenCommands {
    /// Mint a session token without a credential check
    Issue {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Verify a token and print its claims
    Verify { token: String },
}

pub fn cmd_token(command: TokenCommands, runtime: &LeadgateRuntime, json: bool) -> anyhow::Result<()> {
    match command {
        TokenCommands::Issue {
            subject,
            email,
            tenant,
        } => {
            let subject = SessionSubject {
                subject_id: subject,
                email,
                tenant_id: tenant.filter(|t| !t.trim().is_empty()),
            };
            let session = runtime.issuer().issue(&subject)?;
            crate::pout(
                json,
                serde_json::json!({
                    "token": session.token,
                    "claims": session.claims,
                    "set_cookie": session.set_cookie,
                }),
                &format!("{}\nSet-Cookie: {}", session.token, session.set_cookie),
            )
        }
        TokenCommands::Verify { token } => match verify(runtime.codec(), &token) {
            Some(claims) => crate::pout(
                json,
                serde_json::json!({"valid": true, "claims": claims}),
                &describe(&claims),
            ),
            None => crate::pout(json, serde_json::json!({"valid": false}), "invalid"),
        },
    }
}

fn verify(codec: &TokenCodec, token: &str) -> Option<SessionClaims> {
    codec.verify(token.trim()).ok()
}

fn describe(claims: &SessionClaims) -> String {
    format!(
        "valid\n  subject: {}\n  email:   {}\n  tenant:  {}\n  iat:     {}\n  exp:     {}",
        claims.subject_id(),
        claims.email(),
        claims.tenant_id().unwrap_or("-"),
        claims.issued_at(),
        claims.expires_at(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadgate_auth::SigningSecret;

    #[test]
    fn verify_trims_and_rejects_garbage() {
        let codec = TokenCodec::new(SigningSecret::new("cli-secret").unwrap());
        let signed = codec
            .sign(&SessionSubject {
                subject_id: "u1".to_string(),
                email: "u1@x.test".to_string(),
                tenant_id: None,
            })
            .unwrap();

        let claims = verify(&codec, &format!("  {}\n", signed.token)).unwrap();
        assert_eq!(claims, signed.claims);
        assert!(describe(&claims).contains("tenant:  -"));
        assert!(verify(&codec, "not-a-token").is_none());
    }
}
