use uuid::Uuid;

/// Generate an opaque bearer token for sessions and password resets.
///
/// UUIDv4 text: 122 bits from the OS CSPRNG, so tokens never collide in
/// practice and are not guessable.
pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}
