//! Shared harness for HTTP integration suites.
//!
//! Each harness owns services wired to in-memory adapters. Requests run
//! against a freshly initialised actix service sharing the same state, so
//! data written by one call is visible to the next. Credential endpoints are
//! throttled with the default limit, as in production.

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::http::header;
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use chrono::TimeDelta;
use mockable::{Clock, DefaultClock};
use serde_json::Value;

use stockdesk::Trace;
use stockdesk::domain::ports::PayloadCipher;
use stockdesk::domain::{
    AuditEntry, AuthService, CachedLookup, EmailAddress, LoginCredentials, NewUserDraft,
    OtpService, OtpSettings, PersonName, StockService, UserService, UserType,
};
use stockdesk::inbound::http::api_scope;
use stockdesk::inbound::http::envelope::Envelope;
use stockdesk::inbound::http::pipeline::RequestPipeline;
use stockdesk::inbound::http::state::HttpState;
use stockdesk::inbound::http::throttle::{RateLimit, RateLimiter};
use stockdesk::outbound::cache::MemoryCacheStore;
use stockdesk::outbound::notify::LoggingOtpNotifier;
use stockdesk::outbound::persistence::{
    MemoryAlertRepository, MemoryAuditLogRepository, MemoryOtpRepository, MemoryStockRepository,
    MemorySubscriptionRepository, MemoryUserRepository,
};
use stockdesk::outbound::queue::{AuditWorker, audit_channel};
use stockdesk::outbound::security::{Argon2PasswordHasher, JwtTokenIssuer};

pub const ADMIN_EMAIL: &str = "root@stockdesk.test";
pub const ADMIN_PASSWORD: &str = "Adm1n!Passw0rd";
pub const DEVELOPMENT_CODE: &str = "123456";

/// Status and decoded JSON body of one call.
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

/// Services wired to in-memory adapters.
pub struct Harness {
    pub state: HttpState,
    pub audit: Arc<MemoryAuditLogRepository>,
    worker: Option<AuditWorker>,
}

impl Harness {
    /// Harness with transport encryption off.
    pub fn new() -> Self {
        Self::with_cipher(None)
    }

    /// Harness encrypting success bodies with `cipher`.
    pub fn with_cipher(cipher: Option<Arc<dyn PayloadCipher>>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let cache = CachedLookup::new(Arc::new(MemoryCacheStore::new(Duration::from_secs(60))));
        let hasher = Arc::new(Argon2PasswordHasher::default());
        let users = UserService::new(
            Arc::new(MemoryUserRepository::new()),
            hasher.clone(),
            cache.clone(),
            clock.clone(),
        );
        let tokens = Arc::new(JwtTokenIssuer::new(b"integration-secret", TimeDelta::hours(1)));
        let auth = AuthService::new(users.clone(), tokens);
        let otp = OtpService::new(
            users,
            Arc::new(MemoryOtpRepository::default()),
            Arc::new(LoggingOtpNotifier),
            hasher,
            OtpSettings {
                debug_otp: true,
                ..OtpSettings::default()
            },
        );
        let stocks = StockService::new(
            Arc::new(MemoryStockRepository::default()),
            Arc::new(MemorySubscriptionRepository::default()),
            Arc::new(MemoryAlertRepository::default()),
            cache,
            clock.clone(),
        );
        let audit = Arc::new(MemoryAuditLogRepository::default());
        let (queue, worker) = audit_channel(64, audit.clone());
        let limiter = RateLimiter::new(RateLimit::default(), clock.clone());
        let pipeline = RequestPipeline::new(
            Arc::new(auth.clone()),
            Arc::new(queue),
            Envelope::new(cipher),
            clock,
        )
        .with_rate_limiter(Arc::new(limiter));
        Self {
            state: HttpState::new(pipeline, auth, otp, stocks),
            audit,
            worker: Some(worker),
        }
    }

    /// Start draining audit jobs on the current runtime.
    pub fn start_audit_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            actix_web::rt::spawn(worker.run());
        }
    }

    /// Wait until at least `count` audit entries have left the pending state.
    pub async fn settled_audit(&self, count: usize) -> Vec<AuditEntry> {
        for _ in 0..200 {
            let entries = self.audit.entries();
            let settled = entries
                .iter()
                .filter(|entry| entry.response_body.is_some())
                .count();
            if settled >= count {
                return entries;
            }
            actix_web::rt::time::sleep(Duration::from_millis(5)).await;
        }
        self.audit.entries()
    }

    /// Send `request` through the API scope.
    pub async fn call(&self, request: TestRequest) -> Reply {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(self.state.clone()))
                .wrap(Trace)
                .service(api_scope()),
        )
        .await;
        let response = test::call_service(&app, request.to_request()).await;
        let status = response.status();
        let bytes = test::read_body(response).await;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        Reply { status, body }
    }

    /// Create the super admin directly through the account service.
    pub async fn seed_super_admin(&self) {
        let draft = NewUserDraft {
            first_name: PersonName::new("Root").expect("first name"),
            last_name: PersonName::new("Operator").expect("last name"),
            email: EmailAddress::new(ADMIN_EMAIL).expect("admin email"),
            phone: None,
            user_type: UserType::SuperAdmin,
            password: ADMIN_PASSWORD.to_owned(),
        };
        self.state
            .users
            .create_single(None, draft)
            .await
            .expect("seed super admin");
    }

    /// Log in through the service layer and return the bearer token.
    pub async fn token_for(&self, email: &str, password: &str) -> String {
        let credentials =
            LoginCredentials::new(EmailAddress::new(email).expect("email"), password);
        self.state
            .auth
            .login(credentials)
            .await
            .expect("login")
            .access_token
    }
}

/// Attach a bearer token to `request`.
pub fn bearer(request: TestRequest, token: &str) -> TestRequest {
    request.insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
}
