use crate::auth::jwt::{TokenType, verify_token};
use crate::config::Config;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
    pub department_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(
                    actix_web::error::ErrorInternalServerError("Config missing"),
                ));
            }
        };

        ready(AuthUser::from_token(token, &config.jwt_secret).map_err(ErrorUnauthorized))
    }
}

impl AuthUser {
    /// Verifies an access token and resolves its role.
    pub fn from_token(token: &str, secret: &str) -> Result<Self, String> {
        let claims = verify_token(token, secret)?;

        if claims.token_type != TokenType::Access {
            return Err("Access token required".to_string());
        }

        let role = Role::from_id(claims.role).ok_or_else(|| "Invalid role".to_string())?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
            department_id: claims.department_id,
        })
    }

    pub fn require_any(&self, allowed: &[Role]) -> actix_web::Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            tracing::warn!(user_id = self.user_id, role = ?self.role, "Forbidden");
            Err(actix_web::error::ErrorForbidden("Insufficient role"))
        }
    }

    /// Runs, exports, status changes, payslips and deduction rules.
    pub fn require_payroll_manager(&self) -> actix_web::Result<()> {
        self.require_any(&[Role::Admin, Role::Accountant])
    }

    /// Previews, payroll reads and salary components.
    pub fn require_payroll_viewer(&self) -> actix_web::Result<()> {
        self.require_any(&[Role::Admin, Role::Accountant, Role::Hr])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::issue_token;

    #[test]
    fn refresh_tokens_are_not_accepted_for_requests() {
        let token = issue_token(Role::Admin, TokenType::Refresh, "s3cret");
        assert_eq!(
            AuthUser::from_token(&token, "s3cret").unwrap_err(),
            "Access token required"
        );
    }

    #[test]
    fn role_groups() {
        let token = issue_token(Role::Hr, TokenType::Access, "s3cret");
        let hr = AuthUser::from_token(&token, "s3cret").unwrap();

        assert!(hr.require_payroll_viewer().is_ok());
        assert!(hr.require_payroll_manager().is_err());

        let employee = AuthUser {
            role: Role::Employee,
            ..hr
        };
        assert!(employee.require_payroll_viewer().is_err());
    }
}
