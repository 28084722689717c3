use actix_web::dev::Server;
use actix_web::{guard, middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::AuthService;
use crate::configuration::RateLimitSettings;
use crate::logger::LoggerMiddleware;
use crate::middleware::{JwtMiddleware, RateLimitMiddleware, RateLimiter};
use crate::routes::{
    delete_user, get_user, health_check, json_error_handler, list_users, login, logout, refresh,
    register, update_user,
};
use crate::store::Stores;

pub fn run(
    listener: TcpListener,
    stores: Stores,
    auth: AuthService,
    rate_limit: &RateLimitSettings,
) -> Result<Server, std::io::Error> {
    let codec = auth.codec().clone();
    let auth = web::Data::new(auth);
    let principals = web::Data::from(stores.principals);
    // built once so every worker draws from the same bucket
    let limiter = RateLimiter::new(rate_limit);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(auth.clone())
            .app_data(principals.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))

            .route("/health_check", web::get().to(health_check))

            // Public routes, rate-limited
            .service(
                web::resource("/auth/register")
                    .wrap(RateLimitMiddleware::new(limiter.clone()))
                    .route(web::post().to(register)),
            )
            .service(
                web::resource("/auth/login")
                    .wrap(RateLimitMiddleware::new(limiter.clone()))
                    .route(web::post().to(login)),
            )
            .service(
                web::resource("/auth/refresh")
                    .wrap(RateLimitMiddleware::new(limiter.clone()))
                    .route(web::post().to(refresh)),
            )
            .service(
                web::resource("/users")
                    .guard(guard::Post())
                    .wrap(RateLimitMiddleware::new(limiter.clone()))
                    .route(web::post().to(register)),
            )

            // Protected routes (require a valid access token)
            .service(
                web::resource("/auth/logout")
                    .wrap(JwtMiddleware::new(codec.clone()))
                    .route(web::post().to(logout)),
            )
            .service(
                web::resource("/users")
                    .wrap(JwtMiddleware::new(codec.clone()))
                    .route(web::get().to(list_users)),
            )
            .service(
                web::resource("/users/{id}")
                    .wrap(JwtMiddleware::new(codec.clone()))
                    .route(web::get().to(get_user))
                    .route(web::put().to(update_user))
                    .route(web::delete().to(delete_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
