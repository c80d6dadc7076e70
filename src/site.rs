//! The generation driver.
//!
//! Ties the pieces together for one run: open and validate the project,
//! stand up the engine, apply config bindings, copy static assets, render
//! every page into staging, and publish the result.

use crate::{
    config,
    engine::{Engine, Error},
    files::{self, Project},
};
use std::{path::Path, rc::Rc, time::Instant};

/// Generates the site rooted at `root`.
pub fn generate(root: &Path) -> Result<(), Error> {
    let started = Instant::now();

    files::validate(root)?;
    let project = Rc::new(Project::open(root)?);
    let mut engine = Engine::new(Rc::clone(&project))?;

    // Config files declare global bindings that outlive any single page.
    for file in project.config.files() {
        log::debug!("Applying config {}", file.short_path());
        engine.load_config(file)?;
    }

    project.copy_static()?;

    let template = Rc::clone(project.templates.file(config::TEMPLATE_PAGE)?);
    for page in project.pages.files() {
        let html = engine.process_file(page, &template, false)?;
        project.write_page(&page.rel_html_path(), &html)?;
    }

    project.publish()?;
    log::info!(
        "Generated {} pages in {:.2?}",
        project.pages.files().len(),
        started.elapsed()
    );
    Ok(())
}
