use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::status::{AttendanceStatus, CourseStatus, EnrollmentStatus, StatusLabel, StudentStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: i32,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "tipo_documento")]
    pub document_type: String,
    #[serde(rename = "numero_documento")]
    pub document_number: String,
    #[serde(rename = "fecha_nacimiento")]
    pub birth_date: NaiveDate,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "telefono")]
    pub phone: Option<String>,
    #[serde(rename = "ciudad")]
    pub city: Option<String>,
    #[serde(rename = "estadoId")]
    pub status: StudentStatus,
}

impl Student {
    pub fn name_order(&self, other: &Self) -> Ordering {
        compare_names(
            (self.last_name.as_str(), self.first_name.as_str()),
            (other.last_name.as_str(), other.first_name.as_str()),
        )
    }
}

/// Surname first, then first name, ignoring case and accents. Every
/// endpoint that sorts people goes through here so they all agree.
pub fn compare_names(a: (&str, &str), b: (&str, &str)) -> Ordering {
    fold(a.0)
        .cmp(&fold(b.0))
        .then_with(|| fold(a.1).cmp(&fold(b.1)))
        .then_with(|| a.cmp(&b))
}

fn fold(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' | 'ã' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// The slice of a student shown next to attendance and roster entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: i32,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "numero_documento")]
    pub document_number: String,
    #[serde(rename = "correo")]
    pub email: String,
}

impl StudentSummary {
    pub fn name_order(&self, other: &Self) -> Ordering {
        compare_names(
            (self.last_name.as_str(), self.first_name.as_str()),
            (other.last_name.as_str(), other.first_name.as_str()),
        )
    }
}

impl From<&Student> for StudentSummary {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            document_number: student.document_number.clone(),
            email: student.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: i32,
    #[serde(rename = "codigo_curso")]
    pub code: String,
    #[serde(rename = "nombre_curso")]
    pub name: String,
    #[serde(rename = "nivel")]
    pub level: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    /// Length of the course in hours.
    #[serde(rename = "intensidad")]
    pub duration: i32,
    #[serde(rename = "modalidad")]
    pub modality: String,
    #[serde(rename = "valor")]
    pub price: Decimal,
    #[serde(rename = "fecha_inicio")]
    pub start_date: NaiveDate,
    #[serde(rename = "fecha_fin")]
    pub end_date: NaiveDate,
    #[serde(rename = "usuarioId")]
    pub instructor_id: i32,
    #[serde(rename = "estadoId")]
    pub status: CourseStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: i32,
    #[serde(rename = "codigo_curso")]
    pub code: String,
    #[serde(rename = "nombre_curso")]
    pub name: String,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id,
            code: course.code.clone(),
            name: course.name.clone(),
        }
    }
}

/// Instructors and the staff that record attendance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    #[serde(rename = "nombre_completo")]
    pub full_name: String,
    #[serde(rename = "correo")]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub id: i32,
    #[serde(rename = "estudianteId")]
    pub student_id: i32,
    #[serde(rename = "cursoId")]
    pub course_id: i32,
    #[serde(rename = "fecha_inscripcion")]
    pub enrolled_at: DateTime<Utc>,
    #[serde(rename = "estadoId")]
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: i32,
    #[serde(rename = "inscripcionId")]
    pub enrollment_id: i32,
    #[serde(rename = "fecha_clase")]
    pub class_date: DateTime<Utc>,
    #[serde(rename = "usuarioId")]
    pub recorded_by: i32,
    #[serde(rename = "estadoId")]
    pub status: AttendanceStatus,
    #[serde(rename = "observaciones")]
    pub notes: String,
}

/// An attendance row with its status spelled out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceEntry {
    #[serde(flatten)]
    pub attendance: Attendance,
    #[serde(rename = "estado")]
    pub status: StatusLabel,
}

impl From<Attendance> for AttendanceEntry {
    fn from(attendance: Attendance) -> Self {
        let status = attendance.status.expanded();
        Self { attendance, status }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "tipo_documento")]
    pub document_type: String,
    #[serde(rename = "numero_documento")]
    pub document_number: String,
    #[serde(rename = "fecha_nacimiento")]
    pub birth_date: NaiveDate,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
    #[serde(rename = "ciudad", default)]
    pub city: Option<String>,
    #[serde(rename = "estadoId", default)]
    pub status: StudentStatus,
}

/// Fields left as `None` (absent or `null`) keep their stored value; any
/// present value is applied, zero and empty strings included.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudentPatch {
    #[serde(rename = "nombre")]
    pub first_name: Option<String>,
    #[serde(rename = "apellido")]
    pub last_name: Option<String>,
    #[serde(rename = "tipo_documento")]
    pub document_type: Option<String>,
    #[serde(rename = "numero_documento")]
    pub document_number: Option<String>,
    #[serde(rename = "fecha_nacimiento")]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "correo")]
    pub email: Option<String>,
    #[serde(rename = "telefono")]
    pub phone: Option<String>,
    #[serde(rename = "ciudad")]
    pub city: Option<String>,
    #[serde(rename = "estadoId")]
    pub status: Option<StudentStatus>,
}

/// Query of `GET /api/estudiantes/search`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudentFilter {
    /// Matches first name or surname, case-insensitively. Terms are plain
    /// substrings, `%` and `_` included.
    #[serde(rename = "nombre")]
    pub name: Option<String>,
    #[serde(rename = "documento")]
    pub document: Option<String>,
    #[serde(rename = "correo")]
    pub email: Option<String>,
    #[serde(rename = "estado")]
    pub status: Option<StudentStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
    #[serde(rename = "codigo_curso")]
    pub code: String,
    #[serde(rename = "nombre_curso")]
    pub name: String,
    #[serde(rename = "nivel")]
    pub level: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "intensidad")]
    pub duration: i32,
    #[serde(rename = "modalidad")]
    pub modality: String,
    #[serde(rename = "valor")]
    pub price: Decimal,
    #[serde(rename = "fecha_inicio")]
    pub start_date: NaiveDate,
    #[serde(rename = "fecha_fin")]
    pub end_date: NaiveDate,
    #[serde(rename = "usuarioId")]
    pub instructor_id: i32,
    #[serde(rename = "estadoId", default)]
    pub status: CourseStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CoursePatch {
    #[serde(rename = "codigo_curso")]
    pub code: Option<String>,
    #[serde(rename = "nombre_curso")]
    pub name: Option<String>,
    #[serde(rename = "nivel")]
    pub level: Option<String>,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "intensidad")]
    pub duration: Option<i32>,
    #[serde(rename = "modalidad")]
    pub modality: Option<String>,
    #[serde(rename = "valor")]
    pub price: Option<Decimal>,
    #[serde(rename = "fecha_inicio")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "fecha_fin")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "usuarioId")]
    pub instructor_id: Option<i32>,
    #[serde(rename = "estadoId")]
    pub status: Option<CourseStatus>,
}

#[derive(Debug, Clone)]
pub struct NewEnrollment {
    pub student_id: i32,
    pub course_id: i32,
    pub enrolled_at: DateTime<Utc>,
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnrollmentFilter {
    pub student_id: Option<i32>,
    pub course_id: Option<i32>,
    pub status: Option<EnrollmentStatus>,
}

#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub enrollment_id: i32,
    pub class_date: DateTime<Utc>,
    pub recorded_by: i32,
    pub status: AttendanceStatus,
    pub notes: String,
}

/// Attendance rows are selected either per enrollment or per course,
/// optionally restricted to `[from, until)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttendanceFilter {
    pub enrollment_id: Option<i32>,
    pub course_id: Option<i32>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl AttendanceFilter {
    pub fn within(mut self, window: crate::day::DayWindow) -> Self {
        self.from = Some(window.start);
        self.until = Some(window.end);
        self
    }

    pub fn matches(&self, attendance: &Attendance, course_id: i32) -> bool {
        self.enrollment_id
            .map_or(true, |id| id == attendance.enrollment_id)
            && self.course_id.map_or(true, |id| id == course_id)
            && self.from.map_or(true, |from| attendance.class_date >= from)
            && self.until.map_or(true, |until| attendance.class_date < until)
    }
}
