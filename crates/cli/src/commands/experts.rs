//! `bizcanvas experts` — print the built-in expert catalog.

use bizcanvas_core::expert::ExpertCatalog;

pub fn run() {
    let catalog = ExpertCatalog::builtin();
    for expert in catalog.all() {
        println!("{:<24} {:<24} {}", expert.id, expert.name, expert.domain);
    }
}
