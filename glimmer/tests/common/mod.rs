use glimmer::runtime::fake;
use glimmer::InitReport;

/// Install the fake runtime and run the regular init path against it.
pub fn setup() -> InitReport {
    fake::install();
    glimmer::init(fake::api_table()).expect("init against the fake runtime")
}
