use axum::{
    body::{ Body, Bytes },
    extract::{ Path, Query, RawQuery, State },
    http::{ header, HeaderValue, StatusCode },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use log::{ error, info };
use serde::{ Deserialize, Serialize };
use serde_json::{ json, Value };
use tower_http::cors::{ Any, CorsLayer };
use url::form_urlencoded;

use crate::agent::{ ChatAgent, ExchangeError };
use crate::history::DEFAULT_LIST_LIMIT;
use crate::llm::chat::OpenAIChatClient;
use crate::models::chat::{ Message, CONVERSATION_ID_HEADER, CONVERSATION_PARAM };

/// What the diagnostics endpoint needs to try building a model handle.
#[derive(Clone, Debug)]
pub struct OpenAICheck {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Clone)]
pub struct AppState {
    pub agent: ChatAgent,
    pub openai: OpenAICheck,
}

#[derive(Deserialize)]
struct ChatBody {
    messages: Vec<Message>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DirectChatResponse {
    message: Message,
    conversation_id: String,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::HeaderName::from_static(CONVERSATION_ID_HEADER)]);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat_handler).fallback(method_not_allowed))
        .route("/api/direct-chat", post(direct_chat_handler).fallback(method_not_allowed))
        .route("/api/test-openai", get(test_openai_handler))
        .route("/api/conversations", get(list_conversations_handler))
        .route(
            "/api/conversations/{id}",
            get(get_conversation_handler).delete(delete_conversation_handler)
        )
        .layer(cors)
        .with_state(state)
}

fn error_response(status: StatusCode, error: &str, details: Value) -> Response {
    (status, Json(json!({ "error": error, "details": details }))).into_response()
}

fn exchange_error_response(err: ExchangeError) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string(), err.details())
}

fn parse_messages(body: &Bytes) -> Result<Vec<Message>, ExchangeError> {
    serde_json
        ::from_slice::<ChatBody>(body)
        .map(|b| b.messages)
        .map_err(|e| ExchangeError::Request(e.to_string()))
}

/// First `conversationId` pair wins; repeated or unknown parameters are ignored.
fn conversation_id_param(query: Option<&str>) -> Option<String> {
    form_urlencoded
        ::parse(query?.as_bytes())
        .find(|(k, _)| k == CONVERSATION_PARAM)
        .map(|(_, v)| v.into_owned())
}

fn with_conversation_id(mut response: Response, conversation_id: &str) -> Response {
    match HeaderValue::from_str(conversation_id) {
        Ok(value) => {
            response.headers_mut().insert(CONVERSATION_ID_HEADER, value);
        }
        Err(e) => error!("Conversation id {:?} is not a valid header value: {}", conversation_id, e),
    }
    response
}

async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn chat_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    body: Bytes
) -> Response {
    let messages = match parse_messages(&body) {
        Ok(messages) => messages,
        Err(e) => {
            error!("Chat API error: {}", e.details());
            return exchange_error_response(e);
        }
    };

    let conversation_id = conversation_id_param(query.as_deref());
    match state.agent.streamed_exchange(conversation_id.as_deref(), &messages).await {
        Ok(reply) => {
            let response = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(Body::from_stream(reply.body))
                .unwrap_or_else(|e| {
                    error!("Failed to build streaming response: {}", e);
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                });
            with_conversation_id(response, &reply.conversation_id)
        }
        Err(e) => exchange_error_response(e),
    }
}

async fn direct_chat_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    body: Bytes
) -> Response {
    let messages = match parse_messages(&body) {
        Ok(messages) => messages,
        Err(e) => {
            error!("Direct chat API error: {}", e.details());
            return exchange_error_response(e);
        }
    };

    let conversation_id = conversation_id_param(query.as_deref());
    match state.agent.direct_exchange(conversation_id.as_deref(), &messages).await {
        Ok(reply) => {
            let stored_id = reply.conversation_id.clone();
            let response = (
                StatusCode::OK,
                Json(DirectChatResponse {
                    message: reply.message,
                    conversation_id: reply.conversation_id,
                }),
            ).into_response();
            with_conversation_id(response, &stored_id)
        }
        Err(e) => exchange_error_response(e),
    }
}

async fn test_openai_handler(State(state): State<AppState>) -> Response {
    let key = &state.openai.api_key;
    let has_key = !key.is_empty();
    let key_length = key.len();
    info!("OpenAI key present: {}, length: {}", has_key, key_length);

    if !has_key || key_length < 10 {
        return (
            StatusCode::BAD_REQUEST,
            Json(
                json!({
                "error": "Missing or invalid OpenAI API key",
                "hasKey": has_key,
                "keyLength": key_length,
            })
            ),
        ).into_response();
    }

    match
        OpenAIChatClient::new(
            key,
            Some(state.openai.model.clone()),
            Some(state.openai.base_url.clone())
        )
    {
        Ok(_) =>
            (
                StatusCode::OK,
                Json(
                    json!({
                    "success": true,
                    "message": "OpenAI model initialized successfully",
                    "hasKey": has_key,
                    "keyLength": key_length,
                })
                ),
            ).into_response(),
        Err(e) =>
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(
                    json!({
                    "error": "Failed to initialize OpenAI model",
                    "message": e.to_string(),
                    "hasKey": has_key,
                    "keyLength": key_length,
                })
                ),
            ).into_response(),
    }
}

async fn list_conversations_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let conversations = state.agent.history_store().list(limit).await.into_vec();
    Json(conversations).into_response()
}

async fn get_conversation_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.agent.history_store().get(&id).await.found() {
        Some(conversation) => Json(conversation).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Conversation not found" }))).into_response(),
    }
}

async fn delete_conversation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Response {
    let success = state.agent.history_store().delete(&id).await.succeeded();
    Json(json!({ "success": success })).into_response()
}

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;
