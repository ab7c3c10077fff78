//! Visit handlers
//!
//! `POST /visits` takes a multipart form: `customerId`, `inventory` (JSON
//! array of ledger lines), `salesLatitude`, `salesLongitude`, an optional
//! `attendancePhoto` and optional `photo_<productId>_<before|after>` files.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::RangeQuery;
use crate::middleware::CurrentUser;
use crate::services::notification::Audience;
use crate::services::upload::PendingFile;
use crate::services::visit::VisitDetail;
use crate::services::{NotificationService, UploadService, VisitService};
use crate::time::UtcBounds;
use crate::AppState;
use shared::models::{parse_photo_field, InventoryLineItem, PhotoStage, VisitPhotos};
use shared::notification::PushPayload;
use shared::types::{GeoPoint, Pagination};

/// Parsed multipart submission
#[derive(Debug, Default)]
struct VisitForm {
    customer_id: Option<Uuid>,
    inventory: Option<Vec<InventoryLineItem>>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    attendance_photo: Option<PendingFile>,
    photos: Vec<(Uuid, PhotoStage, PendingFile)>,
}

impl VisitForm {
    fn location(&self) -> Option<GeoPoint> {
        Some(GeoPoint::new(self.latitude?, self.longitude?))
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::ValidationError(format!("Malformed multipart body: {}", e))
}

fn parse_coordinate(field: &str, value: &str) -> AppResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| AppError::field(field, "Must be a number"))
}

async fn read_form(mut multipart: Multipart) -> AppResult<VisitForm> {
    let mut form = VisitForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "customerId" => {
                let text = field.text().await.map_err(multipart_error)?;
                let id = Uuid::parse_str(text.trim())
                    .map_err(|_| AppError::field("customerId", "Invalid customer id"))?;
                form.customer_id = Some(id);
            }
            "inventory" => {
                let text = field.text().await.map_err(multipart_error)?;
                let items = serde_json::from_str::<Vec<InventoryLineItem>>(&text).map_err(|e| {
                    AppError::field("inventory", format!("Invalid inventory data: {}", e))
                })?;
                form.inventory = Some(items);
            }
            "salesLatitude" => {
                let text = field.text().await.map_err(multipart_error)?;
                form.latitude = Some(parse_coordinate("salesLatitude", &text)?);
            }
            "salesLongitude" => {
                let text = field.text().await.map_err(multipart_error)?;
                form.longitude = Some(parse_coordinate("salesLongitude", &text)?);
            }
            _ => {
                let photo_slot = parse_photo_field(&name);
                if name != "attendancePhoto" && photo_slot.is_none() {
                    tracing::debug!(field = %name, "Ignoring unknown multipart field");
                    continue;
                }

                let file = PendingFile {
                    file_name: field.file_name().map(str::to_string),
                    content_type: field.content_type().map(str::to_string),
                    bytes: field.bytes().await.map_err(multipart_error)?,
                    field: name,
                };
                match photo_slot {
                    Some((product_id, stage)) => form.photos.push((product_id, stage, file)),
                    None => form.attendance_photo = Some(file),
                }
            }
        }
    }

    Ok(form)
}

/// Write every pending file, removing what was written if one fails
async fn store_files(
    uploads: &UploadService,
    attendance: Option<&PendingFile>,
    photos: &[(Uuid, PhotoStage, PendingFile)],
) -> AppResult<(Option<String>, VisitPhotos, Vec<String>)> {
    let mut written = Vec::new();
    let mut visit_photos = VisitPhotos::new();

    let attendance_path = match attendance {
        Some(file) => {
            let path = uploads.save(file).await?;
            written.push(path.clone());
            Some(path)
        }
        None => None,
    };

    for (product_id, stage, file) in photos {
        let path = match uploads.save(file).await {
            Ok(path) => path,
            Err(e) => {
                uploads.discard(&written).await;
                return Err(e);
            }
        };
        written.push(path.clone());
        let slot = visit_photos.entry(*product_id).or_default();
        match stage {
            PhotoStage::Before => slot.before.push(path),
            PhotoStage::After => slot.after.push(path),
        }
    }

    Ok((attendance_path, visit_photos, written))
}

/// Record a visit
///
/// Every check runs before any file is written; files are removed again if
/// the insert fails.
pub async fn create_visit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<VisitDetail>)> {
    let user = current_user.0;
    let mut form = read_form(multipart).await?;

    let customer_id = form
        .customer_id
        .ok_or_else(|| AppError::field("customerId", "Customer is required"))?;
    let items = form
        .inventory
        .take()
        .ok_or_else(|| AppError::field("inventory", "Inventory is required"))?;

    let visits = VisitService::new(state.db.clone());
    let prepared = visits
        .prepare(&user, customer_id, items, form.location())
        .await?;

    form.photos.retain(|(product_id, _, file)| {
        let listed = prepared.items.iter().any(|i| i.product_id == *product_id);
        if !listed {
            tracing::debug!(field = %file.field, "Dropping photo for a product not in the inventory");
        }
        listed
    });
    if let Some(file) = &form.attendance_photo {
        UploadService::validate(file)?;
    }
    for (_, _, file) in &form.photos {
        UploadService::validate(file)?;
    }

    let uploads = UploadService::new(&state.config.uploads.dir);
    let (attendance_photo, photos, written) =
        store_files(&uploads, form.attendance_photo.as_ref(), &form.photos).await?;

    let customer_name = prepared.customer.name.clone();
    let visit = match visits.record(prepared, photos, attendance_photo).await {
        Ok(visit) => visit,
        Err(e) => {
            uploads.discard(&written).await;
            return Err(e);
        }
    };

    let sales_name = visit
        .user
        .as_ref()
        .map(|u| u.name.clone())
        .unwrap_or_default();
    NotificationService::from_state(&state).notify_in_background(
        Audience::Admins,
        PushPayload::visit_recorded(&sales_name, &customer_name),
    );

    Ok((StatusCode::CREATED, Json(visit)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Paginated visit history, newest first
pub async fn list_visits(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<VisitListQuery>,
) -> AppResult<Json<Value>> {
    let pagination = Pagination::from_query(query.page, query.limit);
    let range = RangeQuery {
        start_date: query.start_date,
        end_date: query.end_date,
    }
    .range()?;

    let service = VisitService::new(state.db);
    let (visits, total) = service
        .list(
            current_user.0.owner_scope(),
            UtcBounds::from_range(range, state.tz),
            query.search.as_deref(),
            pagination,
        )
        .await?;

    Ok(Json(json!({
        "visits": visits,
        "totalPages": pagination.total_pages(total),
        "currentPage": pagination.page,
    })))
}

pub async fn get_visit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(visit_id): Path<Uuid>,
) -> AppResult<Json<VisitDetail>> {
    let service = VisitService::new(state.db);
    Ok(Json(service.get(&current_user.0, visit_id).await?))
}

/// The caller's previous visit to a customer, used to prefill stock counts
pub async fn last_visit_for_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<VisitDetail>> {
    let service = VisitService::new(state.db);
    Ok(Json(
        service
            .last_for_customer(current_user.0.user_id, customer_id)
            .await?,
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastStockResponse {
    pub final_stock: i64,
}

pub async fn last_stock(
    State(state): State<AppState>,
    Path((customer_id, product_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<LastStockResponse>> {
    let service = VisitService::new(state.db);
    let final_stock = service.last_stock(customer_id, product_id).await?;
    Ok(Json(LastStockResponse { final_stock }))
}
