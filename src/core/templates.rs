use crate::error::LeaderboardResult;
use minijinja::{Environment, Template};
use once_cell::sync::Lazy;
use strum::{EnumIter, IntoEnumIterator};
use tracing::{error, info};

static TEMPLATES_ENVIRONMENT: Lazy<Environment> = Lazy::new(|| {
    info!("Initializing templating engine environment.");
    let mut env = Environment::new();

    // Use strum to iterate over the variants of the enum.
    for template in ReportTemplate::iter() {
        if let Err(e) = env.add_template(template.name(), template.template()) {
            error!("Could not load template '{}'. {e}", template.name());
        }
    }

    info!("Templates loaded in templating engine environment.");
    env
});

#[derive(Debug, Clone, Copy, EnumIter)]
pub enum ReportTemplate {
    Standings,
    Stats,
    BulkUpdate,
}

impl ReportTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            ReportTemplate::Standings => "standings.txt",
            ReportTemplate::Stats => "stats.txt",
            ReportTemplate::BulkUpdate => "bulk_update.txt",
        }
    }

    pub fn get(&self) -> LeaderboardResult<Template<'static, 'static>> {
        Ok(TEMPLATES_ENVIRONMENT.get_template(self.name())?)
    }

    pub fn template(&self) -> &'static str {
        // \n\ at each code line end creates a line break at the proper position and discards further spaces in this line of code.
        // \x20 (hex; 32 in decimal) is an ASCII space and an indicator for the first space to be preserved in this line of the string.
        match self {
            ReportTemplate::Standings => {
                "🏆 Top {{ count }} of {{ total }} players (snapshot #{{ generation }}, built {{ built_at }}):\n\
                {{ board }}"
            }
            ReportTemplate::Stats => {
                "📊 {{ total_users }} users | {{ pending_updates }} pending | \
                {{ total_updates }} updates over {{ rebuilds_triggered }} rebuilds \
                ({{ avg_updates_per_rebuild|round(2) }} per rebuild)"
            }
            ReportTemplate::BulkUpdate => {
                "🔁 Bulk update: {{ updated }} users in {{ duration_ms }}ms \
                ({{ updates_per_sec|round(1) }} updates/s)"
            }
        }
    }
}
