mod hive_load;
mod safe_synchronize;
