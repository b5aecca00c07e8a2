use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiDocument,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        addresses::{AddressList, AddressRequest},
        admin::{
            AddAdminRequest, AdminProfile, CarrierCount, CarrierEarnings, EarningsReport,
            EarningsWindow, UserList, UserOverview,
        },
        auth::{
            ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest,
            SignupRequest, UpdatePasswordRequest,
        },
        orders::{
            CreateOrderRequest, FedexOrderInput, OrderList, OrderRef, PickupInput, QuoteRequest,
            QuoteResponse, TrackingUpdated, UpdateOrderStatusRequest, UpdateTrackingRequest,
        },
        payments::{
            AddBalanceRequest, BalanceResponse, CreatePaymentRequest, CreatePaymentResponse,
            EstimateResponse, IpnOutcome, TransactionList,
        },
    },
    entity::sea_orm_active_enums::{Carrier, OrderStatus, Role, TransactionStatus},
    models::{
        Address, FedexDetails, LabelDetails, Order, OrderDetails, PickupWindow, PostalAddress,
        Shipment, ShipmentItem, Transaction, User,
    },
    response::{ApiResponse, Meta},
    routes::{addresses, admin, auth, health, orders, payments, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::signup,
        auth::login,
        auth::forgot_password,
        auth::reset_password,
        users::profile,
        users::update_password,
        addresses::list_addresses,
        addresses::create_address,
        addresses::get_address,
        addresses::update_address,
        addresses::delete_address,
        orders::list_orders,
        orders::create_order,
        orders::quote,
        orders::get_order,
        orders::update_status,
        orders::duplicate_order,
        orders::delete_order,
        payments::balance,
        payments::transactions,
        payments::estimate,
        payments::create_payment,
        payments::ipn,
        payments::payment_status,
        payments::payment_success,
        payments::payment_cancel,
        admin::admin_details,
        admin::list_users,
        admin::add_admin,
        admin::add_balance,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::update_tracking,
        admin::earnings,
        admin::list_all_transactions
    ),
    components(
        schemas(
            Role,
            Carrier,
            OrderStatus,
            TransactionStatus,
            User,
            Address,
            PostalAddress,
            Shipment,
            ShipmentItem,
            LabelDetails,
            PickupWindow,
            FedexDetails,
            OrderDetails,
            Order,
            Transaction,
            SignupRequest,
            LoginRequest,
            LoginResponse,
            UpdatePasswordRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            AddressRequest,
            AddressList,
            CreateOrderRequest,
            FedexOrderInput,
            PickupInput,
            UpdateOrderStatusRequest,
            UpdateTrackingRequest,
            TrackingUpdated,
            QuoteRequest,
            QuoteResponse,
            OrderList,
            OrderRef,
            CreatePaymentRequest,
            CreatePaymentResponse,
            EstimateResponse,
            BalanceResponse,
            TransactionList,
            AddBalanceRequest,
            IpnOutcome,
            AddAdminRequest,
            AdminProfile,
            CarrierCount,
            UserOverview,
            UserList,
            EarningsWindow,
            CarrierEarnings,
            EarningsReport,
            Meta,
            ApiResponse<User>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<TransactionList>,
            ApiResponse<IpnOutcome>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Signup, login and password recovery"),
        (name = "Users", description = "Profile endpoints"),
        (name = "Addresses", description = "Saved address book"),
        (name = "Orders", description = "Per-carrier shipping orders"),
        (name = "Payments", description = "Crypto deposits, balance and IPN callback"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiDocument> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
