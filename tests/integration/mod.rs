mod helpers;
mod test_delete;
mod test_init;
mod test_release;
mod test_status;
mod test_step;
