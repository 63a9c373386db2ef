use crate::config::{DashboardConfig, ServerConfig};
use crate::error::ApiError;
use crate::market::PriceHistory;
use crate::payload::{
    required, AnnouncementsQuery, Confirmation, DashboardSettings, DescriptionBody,
    DescriptionUpdate, MessageRequest, MessageScored, MessagesQuery, NewAnnouncement,
    NewDescription, NewStock, SearchRequest, StockInfo, StockQuery,
};
use crate::scorer::Scorer;
use crate::store::{Store, StoreError};
use actix_files as fs;
use actix_web::dev::Server;
use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::{Method, StatusCode};
use actix_web::{
    get, middleware, post, put, web, App, Either, HttpRequest, HttpResponse, HttpServer,
    Responder,
};
use std::path::PathBuf;

/// Static pages & the ticker the dashboard follows
pub struct Dashboard {
    pub static_dir: PathBuf,
    pub symbol: String,
}

/// Home page
#[get("/")]
async fn index(dashboard: web::Data<Dashboard>) -> actix_web::Result<fs::NamedFile> {
    Ok(fs::NamedFile::open(dashboard.static_dir.join("index.html"))?)
}

/// Settings the dashboard page reads on load
#[get("/dashboard")]
async fn dashboard_settings(dashboard: web::Data<Dashboard>) -> HttpResponse {
    HttpResponse::Ok().json(DashboardSettings {
        symbol: dashboard.symbol.clone(),
    })
}

/// 404 page for GET, 405 for everything else
async fn fallback(
    method: Method,
    dashboard: web::Data<Dashboard>,
) -> actix_web::Result<impl Responder> {
    if method == Method::GET {
        let page = fs::NamedFile::open(dashboard.static_dir.join("404.html"))?
            .customize()
            .with_status(StatusCode::NOT_FOUND);
        Ok(Either::Left(page))
    } else {
        Ok(Either::Right(HttpResponse::MethodNotAllowed().finish()))
    }
}

/// Daily candles of the last month
#[get("/stock-data/{ticker}")]
async fn stock_data(
    market: web::Data<PriceHistory>,
    ticker: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let candles = market.candles(&ticker).await?;
    Ok(HttpResponse::Ok().json(candles))
}

#[post("/add_stock")]
async fn add_stock(
    store: web::Data<Store>,
    body: web::Json<NewStock>,
) -> Result<HttpResponse, ApiError> {
    let NewStock { name, symbol } = body.into_inner();
    let (name, symbol) = (required(name)?, required(symbol)?);
    let id = web::block(move || store.add_stock(&name, &symbol)).await??;
    Ok(HttpResponse::Created().json(Confirmation::with_id("Stock added successfully!", id)))
}

#[post("/search")]
async fn search(
    store: web::Data<Store>,
    body: web::Json<SearchRequest>,
) -> Result<HttpResponse, ApiError> {
    let query = body
        .into_inner()
        .query
        .ok_or_else(|| ApiError::BadRequest("Query is required".into()))?;
    let stocks = web::block(move || store.search_stocks(&query)).await??;
    Ok(HttpResponse::Ok().json(stocks))
}

#[get("/stock-info/{ticker}")]
async fn stock_info(
    store: web::Data<Store>,
    ticker: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let ticker = ticker.into_inner();
    let info = web::block(move || -> Result<Option<StockInfo>, StoreError> {
        let stock = match store.stock_by_symbol(&ticker)? {
            Some(stock) => stock,
            None => return Ok(None),
        };
        let latest = store.latest_announcement(stock.id)?;
        let summary = store.sentiment_summary(stock.id)?;
        Ok(Some(StockInfo::new(stock, latest, summary)))
    })
    .await??;
    info.map(|info| HttpResponse::Ok().json(info))
        .ok_or_else(|| ApiError::NotFound("Stock not found".into()))
}

#[get("/announcements")]
async fn announcements(
    store: web::Data<Store>,
    dashboard: web::Data<Dashboard>,
    query: web::Query<AnnouncementsQuery>,
) -> Result<HttpResponse, ApiError> {
    let symbol = query
        .into_inner()
        .symbol
        .unwrap_or_else(|| dashboard.symbol.clone());
    let announcements = web::block(move || store.announcements_for_symbol(&symbol)).await??;
    Ok(HttpResponse::Ok().json(announcements))
}

#[post("/add_announcement")]
async fn add_announcement(
    store: web::Data<Store>,
    body: web::Json<NewAnnouncement>,
) -> Result<HttpResponse, ApiError> {
    let NewAnnouncement {
        stock_id,
        title,
        date_time,
    } = body.into_inner();
    let stock_id = stock_id.ok_or_else(|| ApiError::BadRequest("Stock ID is required".into()))?;
    let (title, date_time) = (required(title)?, required(date_time)?);
    let id = web::block(move || store.add_announcement(stock_id, &title, &date_time)).await??;
    Ok(HttpResponse::Ok().json(Confirmation::with_id("Announcement added successfully!", id)))
}

/// Score a news item, then persist it alongside its scores
#[post("/add_message")]
async fn add_message(
    store: web::Data<Store>,
    scorer: web::Data<Scorer>,
    body: web::Json<MessageRequest>,
) -> Result<HttpResponse, ApiError> {
    let submission = body.into_inner().into_submission()?;
    let score = scorer.score(&submission.input).await?;

    let stored = score.clone();
    let id = web::block(move || store.add_message(submission.stock_id, &submission.fields, &stored))
        .await??;
    Ok(HttpResponse::Ok().json(MessageScored {
        message: "Message added successfully!",
        id,
        score,
    }))
}

/// Replace a message; its scores are recomputed from the new content & prices
#[put("/update_message/{message_id}")]
async fn update_message(
    store: web::Data<Store>,
    scorer: web::Data<Scorer>,
    message_id: web::Path<i64>,
    body: web::Json<MessageRequest>,
) -> Result<HttpResponse, ApiError> {
    let message_id = message_id.into_inner();
    let (fields, input) = body.into_inner().into_fields()?;
    let score = scorer.score(&input).await?;

    let stored = score.clone();
    let found = web::block(move || store.update_message(message_id, &fields, &stored)).await??;
    if !found {
        return Err(ApiError::NotFound("Message not found".into()));
    }
    Ok(HttpResponse::Ok().json(MessageScored {
        message: "Message updated successfully!",
        id: message_id,
        score,
    }))
}

#[get("/get_messages")]
async fn get_messages(
    store: web::Data<Store>,
    query: web::Query<MessagesQuery>,
) -> Result<HttpResponse, ApiError> {
    let MessagesQuery {
        stock_id,
        offset,
        limit,
    } = query.into_inner();
    let stock_id = stock_id.ok_or_else(|| ApiError::BadRequest("Stock ID is required".into()))?;
    let messages = web::block(move || store.messages(stock_id, limit, offset)).await??;
    Ok(HttpResponse::Ok().json(messages))
}

#[post("/add_description")]
async fn add_description(
    store: web::Data<Store>,
    body: web::Json<NewDescription>,
) -> Result<HttpResponse, ApiError> {
    let NewDescription {
        stock_id,
        description,
    } = body.into_inner();
    let (stock_id, description) = match (stock_id, description) {
        (Some(stock_id), Some(description)) if !description.trim().is_empty() => {
            (stock_id, description)
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Stock ID and description are required".into(),
            ))
        }
    };
    let id = web::block(move || store.add_description(stock_id, &description)).await??;
    Ok(HttpResponse::Created().json(Confirmation::with_id("Description added successfully!", id)))
}

#[put("/update_description/{stock_id}")]
async fn update_description(
    store: web::Data<Store>,
    stock_id: web::Path<i64>,
    body: web::Json<DescriptionUpdate>,
) -> Result<HttpResponse, ApiError> {
    let stock_id = stock_id.into_inner();
    let description = body
        .into_inner()
        .description
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Description is required".into()))?;
    let found = web::block(move || store.update_description(stock_id, &description)).await??;
    if !found {
        return Err(ApiError::NotFound(
            "Stock ID not found or no changes made".into(),
        ));
    }
    Ok(HttpResponse::Ok().json(Confirmation::new("Description updated successfully!")))
}

#[get("/get_description")]
async fn get_description(
    store: web::Data<Store>,
    query: web::Query<StockQuery>,
) -> Result<HttpResponse, ApiError> {
    let stock_id = query
        .into_inner()
        .stock_id
        .ok_or_else(|| ApiError::BadRequest("Stock ID is required".into()))?;
    let description = web::block(move || store.description(stock_id)).await??;
    let status = match description {
        Some(_) => StatusCode::OK,
        None => StatusCode::NOT_FOUND,
    };
    Ok(HttpResponse::build(status).json(DescriptionBody { description }))
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}

fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}

/// Register the JSON api & dashboard routes
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(index)
        .service(dashboard_settings)
        .service(stock_data)
        .service(add_stock)
        .service(search)
        .service(stock_info)
        .service(announcements)
        .service(add_announcement)
        .service(add_message)
        .service(update_message)
        .service(get_messages)
        .service(add_description)
        .service(update_description)
        .service(get_description);
}

pub fn run(
    config: ServerConfig,
    dashboard: DashboardConfig,
    store: Store,
    scorer: Scorer,
    market: PriceHistory,
) -> std::io::Result<Server> {
    let assets = config.static_dir.clone();
    let dashboard = web::Data::new(Dashboard {
        static_dir: config.static_dir.clone(),
        symbol: dashboard.symbol,
    });
    let store = web::Data::new(store);
    let scorer = web::Data::new(scorer);
    let market = web::Data::new(market);
    let create_server = move || {
        App::new()
            .app_data(dashboard.clone())
            .app_data(store.clone())
            .app_data(scorer.clone())
            .app_data(market.clone())
            .wrap(middleware::Logger::default())
            .configure(routes)
            .service(fs::Files::new("/static", assets.clone()))
            .default_service(web::to(fallback))
    };

    Ok(HttpServer::new(create_server)
        .workers(config.workers.unwrap_or_else(num_cpus::get))
        .bind((config.host.as_str(), config.port))?
        .run())
}
