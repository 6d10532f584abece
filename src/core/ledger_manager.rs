use chrono::NaiveDate;

use crate::{
    config::Config,
    core::{
        services::{
            AccountService, BalanceService, CatchUpReport, GoalService, ObligationService,
            RecurrenceService, TransactionService, TransferService,
        },
        time::{Clock, SystemClock},
    },
    domain::ScheduledFixedExpense,
    errors::Result,
    storage::{JsonStore, MemoryStore, RecordStore},
    utils::app_data_dir,
};

/// Facade that binds the ledger services to one store and configuration.
pub struct LedgerManager {
    store: Box<dyn RecordStore>,
    config: Config,
    clock: Box<dyn Clock>,
}

impl LedgerManager {
    pub fn new(store: Box<dyn RecordStore>, config: Config) -> Self {
        Self {
            store,
            config,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn in_memory(config: Config) -> Self {
        Self::new(Box::new(MemoryStore::new()), config)
    }

    /// Opens the JSON tables under the configured data directory.
    pub fn open(config: Config) -> Result<Self> {
        let root = config.data_dir_or(&app_data_dir());
        let store = JsonStore::new(root)?;
        tracing::info!(root = %store.root().display(), "ledger store opened");
        Ok(Self::new(Box::new(store), config))
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn accounts(&self) -> AccountService<'_> {
        AccountService::new(self.store())
    }

    pub fn transactions(&self) -> TransactionService<'_> {
        TransactionService::new(self.store())
    }

    pub fn balances(&self) -> BalanceService<'_> {
        BalanceService::new(self.store(), self.config.reserved_categories)
    }

    pub fn transfers(&self) -> TransferService<'_> {
        TransferService::new(self.store(), self.config.reserved_categories)
    }

    pub fn obligations(&self) -> ObligationService<'_> {
        ObligationService::new(self.store())
    }

    pub fn goals(&self) -> GoalService<'_> {
        GoalService::new(self.store(), self.config.reserved_categories)
    }

    pub fn schedules(&self) -> RecurrenceService<'_> {
        RecurrenceService::new(self.store(), self.config.max_schedule_advances)
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Brings every active schedule up to `today`; run at load time.
    pub fn load_schedules(&self, today: NaiveDate) -> Result<CatchUpReport> {
        self.schedules().catch_up_all(today)
    }

    /// [`Self::load_schedules`] against the manager's clock.
    pub fn refresh_schedules(&self) -> Result<CatchUpReport> {
        self.load_schedules(self.today())
    }

    /// Schedules to remind about within the configured window.
    pub fn reminders(&self, today: NaiveDate) -> Result<Vec<ScheduledFixedExpense>> {
        self.schedules()
            .upcoming(today, self.config.reminder_window_days)
    }
}
