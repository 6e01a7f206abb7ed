//! Assembly of adapters, services and the request pipeline.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use stockdesk::domain::ports::{CacheStore, PayloadCipher};
use stockdesk::domain::{
    AuthService, CachedLookup, ErrorCode, NewUserDraft, OtpService, PersonName, StockService,
    UserService, UserType,
};
use stockdesk::inbound::http::envelope::Envelope;
use stockdesk::inbound::http::pipeline::RequestPipeline;
use stockdesk::inbound::http::state::HttpState;
use stockdesk::inbound::http::throttle::RateLimiter;
use stockdesk::outbound::cache::{MemoryCacheStore, RedisCacheStore};
use stockdesk::outbound::notify::LoggingOtpNotifier;
use stockdesk::outbound::persistence::{
    MemoryAlertRepository, MemoryAuditLogRepository, MemoryOtpRepository, MemoryStockRepository,
    MemorySubscriptionRepository, MemoryUserRepository,
};
use stockdesk::outbound::queue::{AuditWorker, audit_channel};
use stockdesk::outbound::security::{Argon2PasswordHasher, JwtTokenIssuer};

use super::config::{BootstrapAdmin, ServerConfig};

/// Handler state plus the worker draining the audit queue.
pub struct Assembled {
    pub(crate) http_state: HttpState,
    pub(crate) audit_worker: AuditWorker,
}

async fn cache_store(config: &ServerConfig) -> std::io::Result<Arc<dyn CacheStore>> {
    match &config.redis_url {
        Some(url) => {
            let store = RedisCacheStore::connect(url, config.cache_ttl)
                .await
                .map_err(std::io::Error::other)?;
            info!("using redis cache");
            Ok(Arc::new(store))
        }
        None => {
            info!("using in-process cache");
            Ok(Arc::new(MemoryCacheStore::new(config.cache_ttl)))
        }
    }
}

/// Build the services, the pipeline and the audit worker for `config`.
///
/// # Errors
/// Returns [`std::io::Error`] when the cache backend cannot be reached.
pub async fn build_http_state(config: &ServerConfig) -> std::io::Result<Assembled> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let cache = CachedLookup::new(cache_store(config).await?);
    let hasher = Arc::new(Argon2PasswordHasher::default());

    let users = UserService::new(
        Arc::new(MemoryUserRepository::new()),
        hasher.clone(),
        cache.clone(),
        clock.clone(),
    );
    let tokens = Arc::new(JwtTokenIssuer::new(&config.jwt_secret, config.token_ttl));
    let auth = AuthService::new(users.clone(), tokens);
    let otp = OtpService::new(
        users,
        Arc::new(MemoryOtpRepository::default()),
        Arc::new(LoggingOtpNotifier),
        hasher,
        config.otp,
    );
    let stocks = StockService::new(
        Arc::new(MemoryStockRepository::default()),
        Arc::new(MemorySubscriptionRepository::default()),
        Arc::new(MemoryAlertRepository::default()),
        cache,
        clock.clone(),
    );

    let (audit_queue, audit_worker) = audit_channel(
        config.audit_capacity,
        Arc::new(MemoryAuditLogRepository::default()),
    );
    let cipher = config
        .cipher
        .clone()
        .map(|cipher| Arc::new(cipher) as Arc<dyn PayloadCipher>);
    if cipher.is_some() {
        info!("transport encryption enabled");
    }
    let limiter = RateLimiter::new(config.rate_limit, clock.clone());
    let pipeline = RequestPipeline::new(
        Arc::new(auth.clone()),
        Arc::new(audit_queue),
        Envelope::new(cipher),
        clock,
    )
    .with_rate_limiter(Arc::new(limiter));

    if let Some(admin) = &config.bootstrap_admin {
        ensure_super_admin(auth.users(), admin).await?;
    }

    Ok(Assembled {
        http_state: HttpState::new(pipeline, auth, otp, stocks),
        audit_worker,
    })
}

async fn ensure_super_admin(users: &UserService, admin: &BootstrapAdmin) -> std::io::Result<()> {
    let name = |raw: &str| PersonName::new(raw).map_err(std::io::Error::other);
    let draft = NewUserDraft {
        first_name: name("Super")?,
        last_name: name("Admin")?,
        email: admin.email.clone(),
        phone: None,
        user_type: UserType::SuperAdmin,
        password: admin.password.as_str().to_owned(),
    };
    match users.create_single(None, draft).await {
        Ok(user) => {
            info!(user_id = %user.id, "bootstrap super admin created");
            Ok(())
        }
        Err(error) if error.code() == ErrorCode::InvalidRequest => {
            warn!(reason = error.message(), "bootstrap super admin not created");
            Ok(())
        }
        Err(error) => Err(std::io::Error::other(error.to_string())),
    }
}
