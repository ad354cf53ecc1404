//! OpenAPI document for the practice API.
use crate::api::types::{
    BookingStatusRequest, CreateAdminRequest, CreateAdminResponse, ErrorResponse, HealthStatus,
    MessageResponse, SignUpRequest, SystemInfo, TokenRequest, UpdateAdminRequest,
    UpdateAdminResponse,
};
use crate::api::{accounts, articles, bookings, bootstrap, system};
use crate::model::{Account, Article, ArticleFields, Booking, BookingStatus, NewBooking, Session};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "practice-backend",
        version = "v1",
        description = "Bookings, accounts and blog articles for a wellness practice"
    ),
    paths(
        system::system_health,
        system::system_info,
        accounts::sign_up,
        accounts::sign_in,
        bookings::create_booking,
        bookings::list_bookings,
        bookings::get_booking,
        bookings::update_booking_status,
        articles::list_articles,
        articles::get_article,
        articles::create_article,
        articles::update_article,
        articles::delete_article,
        bootstrap::create_admin,
        bootstrap::update_admin,
    ),
    components(schemas(
        Account,
        Article,
        ArticleFields,
        Booking,
        BookingStatus,
        BookingStatusRequest,
        CreateAdminRequest,
        CreateAdminResponse,
        ErrorResponse,
        HealthStatus,
        MessageResponse,
        NewBooking,
        Session,
        SignUpRequest,
        SystemInfo,
        TokenRequest,
        UpdateAdminRequest,
        UpdateAdminResponse,
    )),
    modifiers(&BearerSecurity),
    tags(
        (name = "system", description = "Health and service metadata"),
        (name = "accounts", description = "Sign-up and sign-in"),
        (name = "bookings", description = "Appointment bookings"),
        (name = "articles", description = "Blog articles"),
        (name = "bootstrap", description = "Admin account provisioning")
    )
)]
pub struct ApiDoc;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
