pub mod evidence;
pub mod grouping;
pub mod publish_run;
