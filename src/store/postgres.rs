use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Settings;
use crate::err::Error;
use crate::models::{
    Attendance, AttendanceFilter, Course, CoursePatch, Enrollment, EnrollmentFilter,
    NewAttendance, NewCourse, NewEnrollment, NewStudent, Student, StudentFilter, StudentPatch,
    User,
};
use crate::status::{CourseStatus, EnrollmentStatus};
use crate::store::Store;

const STUDENT_COLUMNS: &str = "id, first_name, last_name, document_type, document_number, \
     birth_date, email, phone, city, status";

const COURSE_COLUMNS: &str = "id, code, name, level, description, duration, modality, price, \
     start_date, end_date, instructor_id, status";

const ENROLLMENT_COLUMNS: &str = "id, student_id, course_id, enrolled_at, status";

/// [`Store`] backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(settings: &Settings) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .connect(&settings.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_student(&self, student: &NewStudent) -> Result<Student, Error> {
        let query = format!(
            "INSERT INTO students (first_name, last_name, document_type, document_number, \
             birth_date, email, phone, city, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            STUDENT_COLUMNS
        );
        let row = sqlx::query_as::<_, Student>(&query)
            .bind(&student.first_name)
            .bind(&student.last_name)
            .bind(&student.document_type)
            .bind(&student.document_number)
            .bind(student.birth_date)
            .bind(&student.email)
            .bind(&student.phone)
            .bind(&student.city)
            .bind(student.status)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_student(&self, id: i32) -> Result<Option<Student>, Error> {
        let query = format!("SELECT {} FROM students WHERE id = $1", STUDENT_COLUMNS);
        let row = sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_student_by_identity(
        &self,
        document: Option<&str>,
        email: Option<&str>,
        except: Option<i32>,
    ) -> Result<Option<Student>, Error> {
        let query = format!(
            "SELECT {} FROM students \
             WHERE (document_number = $1 OR email = $2) \
             AND ($3::int IS NULL OR id <> $3) LIMIT 1",
            STUDENT_COLUMNS
        );
        let row = sqlx::query_as::<_, Student>(&query)
            .bind(document)
            .bind(email)
            .bind(except)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_students(&self, filter: &StudentFilter) -> Result<Vec<Student>, Error> {
        let query = format!(
            "SELECT {} FROM students \
             WHERE ($1::text IS NULL OR strpos(lower(first_name), lower($1)) > 0 \
                    OR strpos(lower(last_name), lower($1)) > 0) \
             AND ($2::text IS NULL OR strpos(document_number, $2) > 0) \
             AND ($3::text IS NULL OR strpos(lower(email), lower($3)) > 0) \
             AND ($4::int IS NULL OR status = $4) \
             ORDER BY last_name ASC, first_name ASC",
            STUDENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, Student>(&query)
            .bind(&filter.name)
            .bind(&filter.document)
            .bind(&filter.email)
            .bind(filter.status)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_student(
        &self,
        id: i32,
        patch: &StudentPatch,
    ) -> Result<Option<Student>, Error> {
        let query = format!(
            "UPDATE students SET \
             first_name = COALESCE($2, first_name), \
             last_name = COALESCE($3, last_name), \
             document_type = COALESCE($4, document_type), \
             document_number = COALESCE($5, document_number), \
             birth_date = COALESCE($6, birth_date), \
             email = COALESCE($7, email), \
             phone = COALESCE($8, phone), \
             city = COALESCE($9, city), \
             status = COALESCE($10, status) \
             WHERE id = $1 RETURNING {}",
            STUDENT_COLUMNS
        );
        let row = sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .bind(&patch.first_name)
            .bind(&patch.last_name)
            .bind(&patch.document_type)
            .bind(&patch.document_number)
            .bind(patch.birth_date)
            .bind(&patch.email)
            .bind(&patch.phone)
            .bind(&patch.city)
            .bind(patch.status)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_course(&self, course: &NewCourse) -> Result<Course, Error> {
        let query = format!(
            "INSERT INTO courses (code, name, level, description, duration, modality, price, \
             start_date, end_date, instructor_id, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
            COURSE_COLUMNS
        );
        let row = sqlx::query_as::<_, Course>(&query)
            .bind(&course.code)
            .bind(&course.name)
            .bind(&course.level)
            .bind(&course.description)
            .bind(course.duration)
            .bind(&course.modality)
            .bind(course.price)
            .bind(course.start_date)
            .bind(course.end_date)
            .bind(course.instructor_id)
            .bind(course.status)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_course(&self, id: i32) -> Result<Option<Course>, Error> {
        let query = format!("SELECT {} FROM courses WHERE id = $1", COURSE_COLUMNS);
        let row = sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_course_by_code(
        &self,
        code: &str,
        except: Option<i32>,
    ) -> Result<Option<Course>, Error> {
        let query = format!(
            "SELECT {} FROM courses WHERE code = $1 AND ($2::int IS NULL OR id <> $2) LIMIT 1",
            COURSE_COLUMNS
        );
        let row = sqlx::query_as::<_, Course>(&query)
            .bind(code)
            .bind(except)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_courses(&self, status: Option<CourseStatus>) -> Result<Vec<Course>, Error> {
        let rows = match status {
            None => {
                let query = format!(
                    "SELECT {} FROM courses ORDER BY start_date DESC, id DESC",
                    COURSE_COLUMNS
                );
                sqlx::query_as::<_, Course>(&query)
                    .fetch_all(&self.pool)
                    .await?
            }
            Some(status) => {
                let query = format!(
                    "SELECT {} FROM courses WHERE status = $1 ORDER BY name ASC",
                    COURSE_COLUMNS
                );
                sqlx::query_as::<_, Course>(&query)
                    .bind(status)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    async fn update_course(&self, id: i32, patch: &CoursePatch) -> Result<Option<Course>, Error> {
        let query = format!(
            "UPDATE courses SET \
             code = COALESCE($2, code), \
             name = COALESCE($3, name), \
             level = COALESCE($4, level), \
             description = COALESCE($5, description), \
             duration = COALESCE($6, duration), \
             modality = COALESCE($7, modality), \
             price = COALESCE($8, price), \
             start_date = COALESCE($9, start_date), \
             end_date = COALESCE($10, end_date), \
             instructor_id = COALESCE($11, instructor_id), \
             status = COALESCE($12, status) \
             WHERE id = $1 RETURNING {}",
            COURSE_COLUMNS
        );
        let row = sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .bind(&patch.code)
            .bind(&patch.name)
            .bind(&patch.level)
            .bind(&patch.description)
            .bind(patch.duration)
            .bind(&patch.modality)
            .bind(patch.price)
            .bind(patch.start_date)
            .bind(patch.end_date)
            .bind(patch.instructor_id)
            .bind(patch.status)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, Error> {
        let row = sqlx::query_as::<_, User>("SELECT id, full_name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_enrollment(&self, enrollment: &NewEnrollment) -> Result<Enrollment, Error> {
        let query = format!(
            "INSERT INTO enrollments (student_id, course_id, enrolled_at, status) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            ENROLLMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, Enrollment>(&query)
            .bind(enrollment.student_id)
            .bind(enrollment.course_id)
            .bind(enrollment.enrolled_at)
            .bind(enrollment.status)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_enrollment(&self, id: i32) -> Result<Option<Enrollment>, Error> {
        let query = format!("SELECT {} FROM enrollments WHERE id = $1", ENROLLMENT_COLUMNS);
        let row = sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_enrollment_for(
        &self,
        student_id: i32,
        course_id: i32,
    ) -> Result<Option<Enrollment>, Error> {
        let query = format!(
            "SELECT {} FROM enrollments WHERE student_id = $1 AND course_id = $2 LIMIT 1",
            ENROLLMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, Enrollment>(&query)
            .bind(student_id)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_enrollments(&self, filter: &EnrollmentFilter) -> Result<Vec<Enrollment>, Error> {
        let query = format!(
            "SELECT {} FROM enrollments \
             WHERE ($1::int IS NULL OR student_id = $1) \
             AND ($2::int IS NULL OR course_id = $2) \
             AND ($3::int IS NULL OR status = $3) \
             ORDER BY enrolled_at DESC, id DESC",
            ENROLLMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, Enrollment>(&query)
            .bind(filter.student_id)
            .bind(filter.course_id)
            .bind(filter.status)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn set_enrollment_status(
        &self,
        id: i32,
        status: EnrollmentStatus,
    ) -> Result<Option<Enrollment>, Error> {
        let query = format!(
            "UPDATE enrollments SET status = $2 WHERE id = $1 RETURNING {}",
            ENROLLMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_attendance(&self, attendance: &NewAttendance) -> Result<Attendance, Error> {
        let row = sqlx::query_as::<_, Attendance>(
            "INSERT INTO attendance (enrollment_id, class_date, recorded_by, status, notes) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, enrollment_id, class_date, recorded_by, status, notes",
        )
        .bind(attendance.enrollment_id)
        .bind(attendance.class_date)
        .bind(attendance.recorded_by)
        .bind(attendance.status)
        .bind(&attendance.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_attendance(&self, filter: &AttendanceFilter) -> Result<Option<Attendance>, Error> {
        let mut rows = self.list_attendance(filter, Some(1)).await?;
        Ok(rows.pop())
    }

    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
        limit: Option<i64>,
    ) -> Result<Vec<Attendance>, Error> {
        let rows = sqlx::query_as::<_, Attendance>(
            "SELECT a.id, a.enrollment_id, a.class_date, a.recorded_by, a.status, a.notes \
             FROM attendance a \
             JOIN enrollments e ON e.id = a.enrollment_id \
             WHERE ($1::int IS NULL OR a.enrollment_id = $1) \
             AND ($2::int IS NULL OR e.course_id = $2) \
             AND ($3::timestamptz IS NULL OR a.class_date >= $3) \
             AND ($4::timestamptz IS NULL OR a.class_date < $4) \
             ORDER BY a.class_date DESC, a.id DESC \
             LIMIT $5",
        )
        .bind(filter.enrollment_id)
        .bind(filter.course_id)
        .bind(filter.from)
        .bind(filter.until)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
