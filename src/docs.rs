use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::purchase::purchase_number,
        crate::api::purchase::cancel_order,
        crate::api::reports::recent_orders,
        crate::api::webhook::razorpay_webhook
    ),
    components(
        schemas(
            crate::api::purchase::PurchaseRequest,
            crate::coordinator::PurchaseReceipt,
            crate::api::webhook::RazorpayEvent,
            crate::api::webhook::RazorpayEventPayload,
            crate::api::webhook::RazorpayPaymentWrapper,
            crate::api::webhook::RazorpayPayment,
            crate::models::Order,
            crate::models::OrderStatus
        )
    ),
    tags(
        (name = "orders", description = "Number purchase lifecycle"),
        (name = "reports", description = "Read-only reporting"),
        (name = "webhooks", description = "Payment gateway callbacks")
    )
)]
pub struct ApiDoc;
