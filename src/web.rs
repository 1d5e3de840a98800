use actix_files::Files;
use actix_session::{storage::CookieSessionStore, Session, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::display::{format_student_name, render_room};
use crate::error::SeatingError;
use crate::export::export_plan;
use crate::parser::{dedup_roster, load_roster_from_reader, Category, StudentId};
use crate::placement::{plan_seating, RoomSummary, SeatingPlan};

const SESSION_ADMIN_KEY: &str = "admin";

// The last successful plan. A failed upload leaves the previous one in place.
pub struct AppState {
    pub config: RunConfig,
    pub plan: Mutex<Option<SeatingPlan>>,
    pub admin_password: String,
    pub export_dir: Option<PathBuf>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    password: String,
}

#[derive(Serialize)]
pub struct StatsResponse {
    students: usize,
    seated: usize,
    dsa: usize,
    no_pc: usize,
    excluded: usize,
    free_seats: usize,
    rooms: Vec<RoomSummary>,
}

#[derive(Serialize)]
pub struct SeatView {
    seat: String,
    student: Option<String>,
}

#[derive(Serialize)]
pub struct RoomResponse {
    room: String,
    seats: Vec<SeatView>,
    diagram: String,
}

#[derive(Serialize)]
pub struct StudentResponse {
    id: StudentId,
    name: String,
    category: Category,
    room: Option<String>,
    seat: Option<String>,
}

// Admin login endpoint
async fn admin_login(
    req: web::Json<LoginRequest>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if req.password == state.admin_password {
        session.insert(SESSION_ADMIN_KEY, true)?;
        Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
    } else {
        Ok(HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Invalid password"})))
    }
}

fn is_admin(req: &HttpRequest, session: &Session, state: &AppState) -> bool {
    let header_ok = req
        .headers()
        .get("X-Admin-Password")
        .and_then(|v| v.to_str().ok())
        .map(|password| password == state.admin_password)
        .unwrap_or(false);
    header_ok || session.get::<bool>(SESSION_ADMIN_KEY).ok().flatten().unwrap_or(false)
}

fn run_upload(state: &AppState, body: &[u8]) -> std::result::Result<SeatingPlan, SeatingError> {
    let roster = dedup_roster(load_roster_from_reader(body)?);
    let catalog = state.config.build_catalog()?;
    let plan = plan_seating(&state.config, roster, catalog)?;
    if let Some(dir) = &state.export_dir {
        export_plan(&plan, &state.config.output_prefix(dir))?;
    }
    Ok(plan)
}

// Admin roster upload endpoint
async fn admin_upload(
    req: HttpRequest,
    session: Session,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &session, &state) {
        return Ok(HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Unauthorized"})));
    }

    match run_upload(&state, &body) {
        Ok(plan) => {
            let seated = plan.ledger.len();
            info!(seated, "seating plan generated from upload");
            *state.plan.lock().unwrap() = Some(plan);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Seating plan generated successfully",
                "seated": seated
            })))
        }
        Err(e) => {
            warn!(error = %e, "upload rejected");
            let unplaced = match &e {
                SeatingError::Placement(p) => p.unplaced().to_vec(),
                _ => Vec::new(),
            };
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": format!("Failed to seat roster: {}", e),
                "unplaced": unplaced
            })))
        }
    }
}

fn no_plan() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({"error": "No seating plan available"}))
}

// Stats endpoint
async fn get_stats(state: web::Data<AppState>) -> Result<HttpResponse> {
    let plan = state.plan.lock().unwrap();
    let Some(ref plan) = *plan else {
        return Ok(no_plan());
    };
    Ok(HttpResponse::Ok().json(StatsResponse {
        students: plan.students.len(),
        seated: plan.ledger.len(),
        dsa: plan.partition.dsa.len(),
        no_pc: plan.partition.no_pc.len(),
        excluded: plan.partition.excluded.len(),
        free_seats: plan.catalog.total_capacity(),
        rooms: plan.summaries(),
    }))
}

async fn get_rooms(state: web::Data<AppState>) -> Result<HttpResponse> {
    let plan = state.plan.lock().unwrap();
    match *plan {
        Some(ref plan) => Ok(HttpResponse::Ok().json(plan.summaries())),
        None => Ok(no_plan()),
    }
}

// Room endpoint: every seat with its label and occupant
async fn get_room(name: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let plan = state.plan.lock().unwrap();
    let Some(ref plan) = *plan else {
        return Ok(no_plan());
    };
    let Some(grid) = plan.catalog.get(name.as_str()) else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "Unknown room"})));
    };

    let labeler = plan.labeler(grid);
    let mut seats = Vec::new();
    for (r, row) in grid.matrix().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if let Some(label) = labeler.label(r, c) {
                seats.push(SeatView {
                    seat: label.to_string(),
                    student: cell.student().map(|id| id.to_string()),
                });
            }
        }
    }

    Ok(HttpResponse::Ok().json(RoomResponse {
        room: grid.name().to_string(),
        seats,
        diagram: render_room(grid, &labeler),
    }))
}

// Student lookup endpoint
async fn get_student(id: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let plan = state.plan.lock().unwrap();
    let Some(ref plan) = *plan else {
        return Ok(no_plan());
    };
    match plan.student(&StudentId::new(id.into_inner())) {
        Some(student) => Ok(HttpResponse::Ok().json(StudentResponse {
            id: student.id.clone(),
            name: format_student_name(&student.surname, &student.name),
            category: student.category,
            room: student.room.clone(),
            seat: student.seat.as_ref().map(|s| s.to_string()),
        })),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "Unknown student"}))),
    }
}

// HTML page handlers
async fn index() -> Result<HttpResponse> {
    let html = include_str!("../templates/index.html");
    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}

async fn admin_page() -> Result<HttpResponse> {
    let html = include_str!("../templates/admin.html");
    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/admin", web::get().to(admin_page))
        .route("/api/login", web::post().to(admin_login))
        .route("/api/upload", web::post().to(admin_upload))
        .route("/api/stats", web::get().to(get_stats))
        .route("/api/rooms", web::get().to(get_rooms))
        .service(web::resource("/api/rooms/{name}").route(web::get().to(get_room)))
        .service(web::resource("/api/students/{id}").route(web::get().to(get_student)));
}

fn session_middleware(key: Key) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_secure(false)
        .build()
}

pub async fn start_server(port: u16, admin_password: String, config: RunConfig, export_dir: Option<PathBuf>) -> std::io::Result<()> {
    let app_state = web::Data::new(AppState {
        config,
        plan: Mutex::new(None),
        admin_password,
        export_dir,
    });
    let key = Key::generate();

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(session_middleware(key.clone()))
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", "static"))
            .configure(configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};

    const ROSTER: &str = "MATRICOLA,COGNOME,NOME,NOTE\n\
        101,Rossi,Marco,\n\
        102,Bianchi,Luca,Dsa\n\
        103,Neri,Sara,Esame online\n";

    fn state(rooms_json: &str) -> web::Data<AppState> {
        web::Data::new(AppState {
            config: RunConfig::from_json_str(rooms_json).unwrap(),
            plan: Mutex::new(None),
            admin_password: "secret".to_string(),
            export_dir: None,
        })
    }

    fn one_room(seats: usize) -> String {
        let cols: Vec<String> = (0..seats).map(|c| c.to_string()).collect();
        format!(
            r#"{{ "rooms": [ {{ "name": "R1", "source": {{ "inline": {{
                "size": {{ "rows": 2, "cols": {seats} }},
                "seats": {{ "rows": [0], "cols": [{}] }},
                "desk": {{ "start": "1:0", "end": "1:0" }}
            }} }} }} ], "snake": "off" }}"#,
            cols.join(", ")
        )
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .wrap(session_middleware(Key::generate()))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn upload_requires_credentials() {
        let state = state(&one_room(4));
        let app = app!(state);
        let req = test::TestRequest::post()
            .uri("/api/upload")
            .set_payload(ROSTER)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn upload_then_lookup_students() {
        let state = state(&one_room(4));
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header(("X-Admin-Password", "secret"))
            .set_payload(ROSTER)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/students/102").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["room"], "R1");
        assert_eq!(body["seat"], "A1");
        assert_eq!(body["name"], "BIANCHI Luca");

        let req = test::TestRequest::get().uri("/api/students/103").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["category"], "online_excluded");
        assert!(body["room"].is_null());

        let req = test::TestRequest::get().uri("/api/stats").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["seated"], 2);
        assert_eq!(body["excluded"], 1);
        assert_eq!(body["free_seats"], 2);

        let req = test::TestRequest::get().uri("/api/rooms/R1").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["seats"].as_array().unwrap().len(), 4);
        assert_eq!(body["seats"][0]["student"], "102");
    }

    #[actix_web::test]
    async fn shortfall_reports_unplaced_ids() {
        let state = state(&one_room(1));
        let app = app!(state);
        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header(("X-Admin-Password", "secret"))
            .set_payload(ROSTER)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["unplaced"], serde_json::json!(["101"]));
        assert!(state.plan.lock().unwrap().is_none());
    }

    #[actix_web::test]
    async fn login_session_authorises_upload() {
        let state = state(&one_room(4));
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(serde_json::json!({"password": "wrong"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(serde_json::json!({"password": "secret"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .response()
            .cookies()
            .next()
            .map(|c| c.into_owned())
            .unwrap();

        let req = test::TestRequest::post()
            .uri("/api/upload")
            .cookie(cookie)
            .set_payload(ROSTER)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn endpoints_without_plan_are_not_found() {
        let state = state(&one_room(4));
        let app = app!(state);
        for uri in ["/api/stats", "/api/rooms", "/api/rooms/R1", "/api/students/101"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }
}
