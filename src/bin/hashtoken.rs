// Shares token generation and hashing with the server.
#[path = "../auth.rs"]
#[allow(dead_code)]
mod auth;

// Usage: hashtoken [token]
// Without an argument a fresh token is generated.
fn main() {
    let token = std::env::args().nth(1).unwrap_or_else(|| {
        let token = auth::generate_access_token();
        println!("token: {token}");
        token
    });

    println!("REMINDER_TRIGGER_TOKEN_HASH={}", auth::hash_access_token(&token));
}
