mod resync_if_necessary;
mod schedule_workers;
