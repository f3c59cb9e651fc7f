use axum::response::Html;
use std::sync::OnceLock;
use tera::{Context, Tera};

use crate::errors::AppError;

const TEMPLATES: &[(&str, &str)] = &[
    ("admin/layout.html", include_str!("../../templates/admin/layout.html")),
    ("admin/login.html", include_str!("../../templates/admin/login.html")),
    ("admin/dashboard.html", include_str!("../../templates/admin/dashboard.html")),
    ("admin/list.html", include_str!("../../templates/admin/list.html")),
    ("admin/form.html", include_str!("../../templates/admin/form.html")),
    ("admin/show.html", include_str!("../../templates/admin/show.html")),
];

/// Embedded admin page templates, compiled once.
///
/// `compile` forces compilation up front; otherwise the first render does it.
#[derive(Default)]
pub struct AdminTemplates {
    engine: OnceLock<Tera>,
}

impl AdminTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&self) -> Result<(), tera::Error> {
        self.engine().map(|_| ())
    }

    pub fn is_compiled(&self) -> bool {
        self.engine.get().is_some()
    }

    fn engine(&self) -> Result<&Tera, tera::Error> {
        if let Some(engine) = self.engine.get() {
            return Ok(engine);
        }
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        Ok(self.engine.get_or_init(|| tera))
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<Html<String>, AppError> {
        Ok(Html(self.engine()?.render(name, context)?))
    }
}
