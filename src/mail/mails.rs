use super::sendmail::send_email;

/// Mail the signup confirmation code. The code itself is the payload;
/// the exchange happens against the API, not a browser link.
pub async fn send_confirmation_email(
    to_email: &str,
    username: &str,
    code: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subject = "Registration confirmation";
    let body = confirmation_body(username, code);

    send_email(to_email, subject, body).await
}

fn confirmation_body(username: &str, code: &str) -> String {
    format!(
        "Hi {username},\n\n\
         Your confirmation code: {code}\n\n\
         Exchange it for an access token to finish signing up.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_username_and_code() {
        let body = confirmation_body("frodo", "abc.def.ghi");
        assert!(body.contains("frodo"));
        assert!(body.contains("abc.def.ghi"));
    }
}
