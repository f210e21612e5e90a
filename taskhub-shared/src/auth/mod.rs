/// Authentication and authorization
///
/// # Modules
///
/// - [`authorization`]: role rule table, object-level predicates and task
///   visibility
/// - [`password`]: Argon2id password hashing and strength validation
/// - [`jwt`]: HS256 access/refresh token issuance and validation
/// - [`middleware`]: resolution of the request actor from a bearer token
///
/// # Example
///
/// ```
/// use taskhub_shared::auth::password::{hash_password, verify_password, HashParams};
/// use taskhub_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password", &HashParams::fast())?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let secret = "secret-key-at-least-32-bytes-long!!";
/// let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), secret)?;
/// validate_access_token(&token, secret)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
