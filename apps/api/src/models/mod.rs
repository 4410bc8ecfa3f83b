pub mod match_run;
