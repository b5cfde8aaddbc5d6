pub mod attendance;
pub mod config;
pub mod courses;
pub mod day;
pub mod enrollments;
pub mod err;
pub mod models;
pub mod status;
pub mod store;
pub mod students;
pub mod validate;

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

pub use crate::err::Error;
use crate::store::Store;

pub type Payload<T> = Result<Json<T>, Error>;
pub type Created<T> = Result<(StatusCode, Json<T>), Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(value))
}

pub fn created<V>(value: V) -> Created<V>
where
    V: Serialize,
{
    Ok((StatusCode::CREATED, Json(value)))
}

/// JSON request body whose rejections answer with our own error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct Input<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct Param<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct Filter<T>(pub T);

/// State shared by every handler.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn Store>,
}

impl AppContext {
    pub fn new<S>(store: S) -> Self
    where
        S: Store + 'static,
    {
        Self {
            store: Arc::new(store),
        }
    }
}

pub fn router(ctx: AppContext) -> Router {
    let api = Router::new()
        .route(
            "/estudiantes",
            post(students::create_student).get(students::list_students),
        )
        .route("/estudiantes/search", get(students::search_students))
        .route(
            "/estudiantes/:id",
            get(students::read_student)
                .put(students::update_student)
                .delete(students::delete_student),
        )
        .route(
            "/cursos",
            post(courses::create_course).get(courses::list_courses),
        )
        .route("/cursos/activos", get(courses::list_active_courses))
        .route(
            "/cursos/:id",
            get(courses::read_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        )
        .route("/cursos/:id/estudiantes", get(courses::course_students))
        .route(
            "/cursos/:id/estudiantes-asistencia",
            get(attendance::attendance_roster),
        )
        .route(
            "/inscripciones",
            post(enrollments::create_enrollment).get(enrollments::list_enrollments),
        )
        .route(
            "/inscripciones/curso/:id",
            get(enrollments::course_enrollments),
        )
        .route(
            "/inscripciones/estudiante/:id",
            get(enrollments::student_enrollments),
        )
        .route(
            "/inscripciones/:id",
            axum::routing::put(enrollments::update_enrollment)
                .delete(enrollments::delete_enrollment),
        )
        .route("/asistencias", post(attendance::mark_attendance))
        .route(
            "/asistencias/marcar-clase",
            post(attendance::mark_class_attendance),
        )
        .route(
            "/asistencias/curso/:id/fecha/:fecha",
            get(attendance::course_attendance_on),
        )
        .route(
            "/asistencias/verificar/:id/:fecha",
            get(attendance::verify_attendance),
        );

    Router::new()
        .nest("/api", api)
        .fallback(err::handler404)
        .with_state(ctx)
        .layer(CorsLayer::permissive())
}
