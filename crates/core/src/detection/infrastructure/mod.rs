pub mod scripted_detector;
